//! Remote server configuration
//!
//! Servers are described by [`McpServerConfig`], usually loaded from TOML:
//!
//! ```toml
//! [[servers]]
//! name = "browser"
//! transport = "stdio"
//! command = "npx"
//! args = ["@playwright/mcp@latest"]
//!
//! [[servers]]
//! name = "search"
//! transport = "streamable_http"
//! url = "https://example.com/mcp"
//! headers = { Authorization = "Bearer xxx" }
//! timeout_secs = 10
//! ```

use crate::error::{McpError, McpResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default event-read timeout in seconds
pub const DEFAULT_SSE_READ_TIMEOUT_SECS: u64 = 300;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_sse_read_timeout_secs() -> u64 {
    DEFAULT_SSE_READ_TIMEOUT_SECS
}

/// How to reach a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Spawn a subprocess and speak MCP over its stdin/stdout
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Legacy HTTP+SSE transport, URL conventionally ending in `/sse`
    Sse {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Streamable HTTP transport, URL conventionally ending in `/mcp`
    StreamableHttp {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

/// One remote MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: TransportConfig,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum silence on an event stream before it is considered dead
    #[serde(default = "default_sse_read_timeout_secs")]
    pub sse_read_timeout_secs: u64,
}

impl McpServerConfig {
    fn with_transport(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            sse_read_timeout_secs: DEFAULT_SSE_READ_TIMEOUT_SECS,
        }
    }

    /// Subprocess server.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Stdio {
                command: command.into(),
                args,
                cwd: None,
                env: HashMap::new(),
            },
        )
    }

    /// Legacy SSE server.
    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Sse {
                url: url.into(),
                headers: HashMap::new(),
            },
        )
    }

    /// Streamable HTTP server.
    pub fn streamable_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::StreamableHttp {
                url: url.into(),
                headers: HashMap::new(),
            },
        )
    }

    /// Add an HTTP header. Ignored for stdio servers.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.transport {
            TransportConfig::Sse { headers, .. }
            | TransportConfig::StreamableHttp { headers, .. } => {
                headers.insert(key.into(), value.into());
            }
            TransportConfig::Stdio { .. } => {}
        }
        self
    }

    /// Set an environment variable. Ignored for HTTP servers.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Stdio { env, .. } = &mut self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Set the working directory. Ignored for HTTP servers.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        if let TransportConfig::Stdio { cwd, .. } = &mut self.transport {
            *cwd = Some(dir.into());
        }
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn sse_read_timeout_secs(mut self, secs: u64) -> Self {
        self.sse_read_timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sse_read_timeout(&self) -> Duration {
        Duration::from_secs(self.sse_read_timeout_secs)
    }

    /// Check the configuration before any connection attempt.
    pub fn validate(&self) -> McpResult<()> {
        if self.name.trim().is_empty() {
            return Err(McpError::ConfigError("server name must not be empty".to_string()));
        }
        if self.timeout_secs == 0 || self.sse_read_timeout_secs == 0 {
            return Err(McpError::ConfigError(format!(
                "server '{}': timeouts must be greater than zero",
                self.name
            )));
        }
        match &self.transport {
            TransportConfig::Stdio { command, .. } if command.trim().is_empty() => Err(
                McpError::ConfigError(format!("server '{}': empty command", self.name)),
            ),
            TransportConfig::Sse { url, .. } | TransportConfig::StreamableHttp { url, .. } => {
                url::Url::parse(url).map(|_| ()).map_err(|e| {
                    McpError::ConfigError(format!(
                        "server '{}': invalid url '{url}': {e}",
                        self.name
                    ))
                })
            }
            TransportConfig::Stdio { .. } => Ok(()),
        }
    }
}

/// A set of servers, as stored in a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpClientsConfig {
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
}

impl McpClientsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> McpResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate every server and reject duplicate names.
    pub fn validate(&self) -> McpResult<()> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(McpError::ConfigError(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
        }
        Ok(())
    }

    pub fn server(&self, name: &str) -> Option<&McpServerConfig> {
        self.servers.iter().find(|server| server.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [[servers]]
        name = "browser"
        transport = "stdio"
        command = "npx"
        args = ["@playwright/mcp@latest"]
        env = { DISPLAY = ":0" }

        [[servers]]
        name = "search"
        transport = "streamable_http"
        url = "https://example.com/mcp"
        headers = { Authorization = "Bearer xxx" }
        timeout_secs = 10

        [[servers]]
        name = "legacy"
        transport = "sse"
        url = "http://localhost:8080/sse"
    "#;

    #[test]
    fn test_parse_toml() {
        let config = McpClientsConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.servers.len(), 3);

        let browser = config.server("browser").unwrap();
        assert!(matches!(
            &browser.transport,
            TransportConfig::Stdio { command, args, env, .. }
                if command == "npx" && args.len() == 1 && env["DISPLAY"] == ":0"
        ));
        assert_eq!(browser.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let search = config.server("search").unwrap();
        assert_eq!(search.timeout_secs, 10);
        assert_eq!(search.sse_read_timeout_secs, DEFAULT_SSE_READ_TIMEOUT_SECS);
        assert!(matches!(
            &search.transport,
            TransportConfig::StreamableHttp { headers, .. }
                if headers["Authorization"] == "Bearer xxx"
        ));

        assert!(matches!(
            config.server("legacy").unwrap().transport,
            TransportConfig::Sse { .. }
        ));
    }

    #[test]
    fn test_validation_failures() {
        let duplicate = r#"
            [[servers]]
            name = "a"
            transport = "stdio"
            command = "x"

            [[servers]]
            name = "a"
            transport = "stdio"
            command = "y"
        "#;
        assert!(matches!(
            McpClientsConfig::from_toml_str(duplicate),
            Err(McpError::ConfigError(_))
        ));

        let blank_command = McpServerConfig::stdio("s", "  ", vec![]);
        assert!(blank_command.validate().is_err());
        assert!(McpServerConfig::sse("s", "not a url").validate().is_err());
        assert!(
            McpServerConfig::streamable_http("s", "http://localhost/mcp")
                .timeout_secs(0)
                .validate()
                .is_err()
        );
        assert!(
            McpServerConfig::streamable_http("s", "http://localhost/mcp")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_builder_helpers() {
        let config = McpServerConfig::stdio("local", "python", vec!["server.py".into()])
            .env("TOKEN", "t")
            .cwd("/tmp")
            .header("ignored", "for stdio");
        match config.transport {
            TransportConfig::Stdio { env, cwd, .. } => {
                assert_eq!(env["TOKEN"], "t");
                assert_eq!(cwd, Some(PathBuf::from("/tmp")));
            }
            other => panic!("unexpected transport {other:?}"),
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = McpClientsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.servers.len(), 3);

        assert!(matches!(
            McpClientsConfig::from_file("/definitely/not/here.toml"),
            Err(McpError::IoError(_))
        ));
    }
}
