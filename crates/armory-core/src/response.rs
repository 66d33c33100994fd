//! Response envelope
//!
//! Every tool invocation, local or remote, produces a finite sequence of
//! [`ResponseChunk`]s. A chunk carries typed content blocks, opaque metadata
//! and two terminal flags: `is_last` marks the final chunk of an invocation and
//! `is_interrupted` marks an invocation that observed cancellation. An
//! interrupted chunk is always the last chunk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Human-readable note attached to interrupted invocations.
pub const INTERRUPTION_NOTE: &str = "The tool call has been interrupted by the user.";

/// Where the bytes of a media block live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    /// Inline base64 payload.
    Base64 { media_type: String, data: String },
    /// Reference by URL.
    Url { url: String },
}

/// A typed piece of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text { text: String },
    /// Image payload
    Image { source: MediaSource },
    /// Audio payload
    Audio { source: MediaSource },
    /// Structured JSON data
    Data { data: Value },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create a structured data block.
    pub fn data(data: Value) -> Self {
        ContentBlock::Data { data }
    }

    /// Create an inline base64 image block.
    pub fn image_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: MediaSource::Base64 {
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }

    /// Create an inline base64 audio block.
    pub fn audio_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentBlock::Audio {
            source: MediaSource::Base64 {
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }

    /// Borrow the text of a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// The unit of output from a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseChunk {
    /// Identifier shared by every chunk of one invocation.
    pub id: String,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Opaque metadata for the agent loop.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Set when the invocation observed cancellation.
    #[serde(default)]
    pub is_interrupted: bool,
    /// Set on the final chunk of an invocation.
    #[serde(default)]
    pub is_last: bool,
}

impl Default for ResponseChunk {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ResponseChunk {
    /// Create a chunk from content blocks.
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata: Map::new(),
            is_interrupted: false,
            is_last: false,
        }
    }

    /// Create a chunk holding a single text block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use armory_core::ResponseChunk;
    ///
    /// let chunk = ResponseChunk::text("1234");
    /// assert_eq!(chunk.text_content(), "1234");
    /// assert!(!chunk.is_interrupted);
    /// ```
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentBlock::text(text)])
    }

    /// Create a chunk holding a single structured data block.
    pub fn data(data: Value) -> Self {
        Self::new(vec![ContentBlock::data(data)])
    }

    /// The terminal chunk synthesized when an invocation is cancelled before
    /// it produced anything.
    pub fn interrupted() -> Self {
        let mut chunk = Self::new(Vec::new());
        chunk.mark_interrupted();
        chunk
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Merge the interruption into this chunk.
    ///
    /// Existing content is preserved; the interruption note is appended and the
    /// chunk becomes terminal.
    pub fn mark_interrupted(&mut self) {
        if !self.is_interrupted {
            self.content.push(ContentBlock::text(INTERRUPTION_NOTE));
        }
        self.is_interrupted = true;
        self.is_last = true;
    }

    /// Concatenate all text blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Text content without the interruption note.
    pub fn text_without_note(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .filter(|text| *text != INTERRUPTION_NOTE)
            .collect::<Vec<_>>()
            .join("")
    }
}
