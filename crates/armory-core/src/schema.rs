//! Declarative parameter metadata and schema extraction
//!
//! Tools describe their parameters with a [`ToolSignature`] built from
//! [`ParamSpec`]s. At registration time [`extract_schema`] turns a signature
//! into the function-calling [`ToolSchema`] the model sees:
//!
//! - preset parameters are removed from `properties` and `required`
//! - an optional [`ExtensionSchema`] is unioned into `properties`
//! - undocumented parameters and extension collisions fail fast
//!
//! # Example
//!
//! ```rust
//! use armory_core::schema::{extract_schema, ParamSpec, ToolSignature};
//!
//! let signature = ToolSignature::new("search", "Search the web")
//!     .param(ParamSpec::string("query", "The search query"))
//!     .param(ParamSpec::string("api_key", "API key for the search backend"));
//!
//! let schema = extract_schema(&signature, &["api_key"], None).unwrap();
//! assert!(schema.has_property("query"));
//! assert!(!schema.has_property("api_key"));
//! assert_eq!(schema.parameters.required, vec!["query".to_string()]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use thiserror::Error;

/// Errors detected while turning a signature into a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Tool names must be non-empty.
    #[error("tool name must not be empty")]
    EmptyName,

    /// A declared parameter has no description.
    #[error("parameter '{param}' of tool '{tool}' is not documented")]
    UndocumentedParameter { tool: String, param: String },

    /// The same parameter is declared twice.
    #[error("parameter '{param}' of tool '{tool}' is declared more than once")]
    DuplicateParameter { tool: String, param: String },

    /// An extension field shadows a declared parameter.
    #[error("extension field '{field}' collides with a declared parameter of tool '{tool}'")]
    ExtensionCollision { tool: String, field: String },

    /// Extensions require a tool that accepts undeclared arguments.
    #[error("tool '{0}' does not accept extra arguments and cannot be extended")]
    ExtraArgumentsNotAccepted(String),

    /// The extension is not a JSON object schema.
    #[error("invalid extension schema: {0}")]
    InvalidExtension(String),
}

/// Declarative description of one tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// JSON Schema fragment for the value, without `description`.
    pub schema: Map<String, Value>,
}

impl ParamSpec {
    fn typed(name: impl Into<String>, json_type: &str, description: impl Into<String>) -> Self {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String(json_type.to_string()));
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            schema,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "string", description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "integer", description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "number", description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "boolean", description)
    }

    pub fn object(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::typed(name, "object", description)
    }

    /// Array parameter with the given item schema.
    pub fn array(name: impl Into<String>, description: impl Into<String>, items: Value) -> Self {
        let mut spec = Self::typed(name, "array", description);
        spec.schema.insert("items".to_string(), items);
        spec
    }

    /// Parameter with an arbitrary JSON Schema fragment.
    pub fn raw(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            schema,
        }
    }

    /// Mark the parameter optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default value; parameters with defaults are optional.
    pub fn default_value(mut self, value: Value) -> Self {
        self.required = false;
        self.schema.insert("default".to_string(), value);
        self
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.schema.insert("enum".to_string(), Value::Array(values));
        self
    }

    fn property(&self) -> Value {
        let mut property = self.schema.clone();
        if !self.description.is_empty() {
            property.insert(
                "description".to_string(),
                Value::String(self.description.clone()),
            );
        }
        Value::Object(property)
    }
}

/// Declarative metadata attached to every tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSignature {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Whether the tool accepts named arguments it does not declare.
    pub accepts_extra: bool,
    lenient: bool,
    /// Top-level schema keywords such as `$defs` or `additionalProperties`.
    keywords: Map<String, Value>,
}

impl ToolSignature {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            accepts_extra: false,
            lenient: false,
            keywords: Map::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Allow undeclared named arguments, which makes the tool extensible.
    pub fn accepts_extra(mut self) -> Self {
        self.accepts_extra = true;
        self
    }

    /// Carry a top-level keyword into the emitted `parameters` object.
    ///
    /// `type`, `properties` and `required` are derived from the parameters
    /// and cannot be overridden this way.
    pub fn keyword(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !is_derived_keyword(&key) {
            self.keywords.insert(key, value);
        }
        self
    }

    /// Top-level keywords carried alongside the parameters.
    pub fn keywords(&self) -> &Map<String, Value> {
        &self.keywords
    }

    /// Build a signature from a protocol-supplied JSON object schema.
    ///
    /// Remote servers frequently omit parameter descriptions, so signatures
    /// built this way skip the documentation check. Keywords beside
    /// `properties` (`$defs`, `additionalProperties`, ...) are kept so that
    /// `$ref`s inside the parameters still resolve.
    pub fn from_json_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &Map<String, Value>,
    ) -> Self {
        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let params = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(param, property)| {
                        let mut fragment = property.as_object().cloned().unwrap_or_default();
                        let description = match fragment.remove("description") {
                            Some(Value::String(text)) => text,
                            _ => String::new(),
                        };
                        let spec = ParamSpec::raw(param.clone(), description, fragment);
                        if required.contains(param.as_str()) {
                            spec
                        } else {
                            spec.optional()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let keywords = schema
            .iter()
            .filter(|(key, _)| !is_derived_keyword(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            name: name.into(),
            description: description.into(),
            params,
            accepts_extra: false,
            lenient: true,
            keywords,
        }
    }

    /// Check whether a parameter is declared.
    pub fn declares(&self, param: &str) -> bool {
        self.params.iter().any(|p| p.name == param)
    }

    /// Whether undocumented parameters are tolerated.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }
}

fn is_derived_keyword(key: &str) -> bool {
    matches!(key, "type" | "properties" | "required")
}

/// Additional parameters merged into a tool's schema after registration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ExtensionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field described like any other parameter.
    pub fn field(mut self, param: ParamSpec) -> Self {
        if param.required {
            self.required.push(param.name.clone());
        }
        self.properties.insert(param.name.clone(), param.property());
        self
    }

    /// Parse an extension from a JSON object schema (`{"type": "object", "properties": {...}}`).
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        let object = schema
            .as_object()
            .ok_or_else(|| SchemaError::InvalidExtension("expected a JSON object".to_string()))?;
        let properties = object
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| SchemaError::InvalidExtension("missing 'properties'".to_string()))?;
        let required = object
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            properties,
            required,
        })
    }

    /// Names of the fields this extension adds.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

/// The `parameters` object of a function-calling schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
    /// Remaining JSON Schema keywords, e.g. `$defs` referenced from `properties`.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Wire-format tool schema: `{name, description, parameters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

impl ToolSchema {
    /// Check whether the schema exposes a parameter.
    pub fn has_property(&self, name: &str) -> bool {
        self.parameters.properties.contains_key(name)
    }

    /// The vendor-wrapped form `{"type": "function", "function": {...}}`.
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "function": self,
        })
    }
}

/// Derive the wire schema for a signature.
///
/// `preset_keys` are hidden from the result. `extension` fields are unioned
/// into `properties`; they must not collide with any declared parameter,
/// preset or not.
pub fn extract_schema(
    signature: &ToolSignature,
    preset_keys: &[&str],
    extension: Option<&ExtensionSchema>,
) -> Result<ToolSchema, SchemaError> {
    if signature.name.trim().is_empty() {
        return Err(SchemaError::EmptyName);
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut seen = HashSet::new();

    for param in &signature.params {
        if !seen.insert(param.name.as_str()) {
            return Err(SchemaError::DuplicateParameter {
                tool: signature.name.clone(),
                param: param.name.clone(),
            });
        }
        if !signature.lenient && param.description.trim().is_empty() {
            return Err(SchemaError::UndocumentedParameter {
                tool: signature.name.clone(),
                param: param.name.clone(),
            });
        }
        if preset_keys.contains(&param.name.as_str()) {
            continue;
        }
        if param.required {
            required.push(param.name.clone());
        }
        properties.insert(param.name.clone(), param.property());
    }

    if let Some(extension) = extension {
        if !signature.accepts_extra {
            return Err(SchemaError::ExtraArgumentsNotAccepted(
                signature.name.clone(),
            ));
        }
        for (field, property) in &extension.properties {
            if seen.contains(field.as_str()) {
                return Err(SchemaError::ExtensionCollision {
                    tool: signature.name.clone(),
                    field: field.clone(),
                });
            }
            properties.insert(field.clone(), property.clone());
        }
        required.extend(extension.required.iter().cloned());
    }

    Ok(ToolSchema {
        name: signature.name.clone(),
        description: signature.description.clone(),
        parameters: ParametersSchema {
            kind: "object".to_string(),
            properties,
            required,
            extra: signature.keywords.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_signature() -> ToolSignature {
        ToolSignature::new("search", "Search the web")
            .param(ParamSpec::string("query", "The search query"))
            .param(ParamSpec::string("api_key", "Backend API key"))
            .param(ParamSpec::integer("limit", "Maximum results").default_value(json!(10)))
    }

    #[test]
    fn test_schema_wire_shape() {
        let schema = extract_schema(&search_signature(), &[], None).unwrap();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["name"], "search");
        assert_eq!(value["description"], "Search the web");
        assert_eq!(value["parameters"]["type"], "object");
        assert_eq!(value["parameters"]["properties"]["query"]["type"], "string");
        assert_eq!(
            value["parameters"]["properties"]["query"]["description"],
            "The search query"
        );
        assert_eq!(value["parameters"]["properties"]["limit"]["default"], 10);
        assert_eq!(value["parameters"]["required"], json!(["query", "api_key"]));
    }

    #[test]
    fn test_preset_params_hidden() {
        let schema = extract_schema(&search_signature(), &["api_key"], None).unwrap();
        assert!(!schema.has_property("api_key"));
        assert!(!schema.parameters.required.contains(&"api_key".to_string()));
        assert!(schema.has_property("query"));
    }

    #[test]
    fn test_undocumented_parameter_rejected() {
        let signature = ToolSignature::new("t", "d")
            .param(ParamSpec::string("x", "   "));
        let err = extract_schema(&signature, &[], None).unwrap_err();
        assert!(matches!(err, SchemaError::UndocumentedParameter { .. }));
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let signature = ToolSignature::new("t", "d")
            .param(ParamSpec::string("x", "first"))
            .param(ParamSpec::string("x", "second"));
        let err = extract_schema(&signature, &[], None).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateParameter { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        let signature = ToolSignature::new("", "d");
        assert_eq!(
            extract_schema(&signature, &[], None).unwrap_err(),
            SchemaError::EmptyName
        );
    }

    #[test]
    fn test_extension_adds_fields_without_removing() {
        let signature = search_signature().accepts_extra();
        let base = extract_schema(&signature, &[], None).unwrap();

        let extension = ExtensionSchema::new()
            .field(ParamSpec::string("region", "Result region"))
            .field(ParamSpec::boolean("safe", "Safe search").optional());
        let extended = extract_schema(&signature, &[], Some(&extension)).unwrap();

        for (name, property) in &base.parameters.properties {
            assert_eq!(extended.parameters.properties.get(name), Some(property));
        }
        assert!(extended.has_property("region"));
        assert!(extended.has_property("safe"));
        assert!(extended.parameters.required.contains(&"region".to_string()));
        assert!(!extended.parameters.required.contains(&"safe".to_string()));
    }

    #[test]
    fn test_extension_collision_rejected() {
        let signature = search_signature().accepts_extra();
        let extension = ExtensionSchema::new().field(ParamSpec::string("query", "again"));
        let err = extract_schema(&signature, &[], Some(&extension)).unwrap_err();
        assert!(matches!(err, SchemaError::ExtensionCollision { field, .. } if field == "query"));

        // Preset parameters are still declared parameters
        let extension = ExtensionSchema::new().field(ParamSpec::string("api_key", "again"));
        let err = extract_schema(&signature, &["api_key"], Some(&extension)).unwrap_err();
        assert!(matches!(err, SchemaError::ExtensionCollision { .. }));
    }

    #[test]
    fn test_extension_requires_extra_arguments() {
        let extension = ExtensionSchema::new().field(ParamSpec::string("region", "Region"));
        let err = extract_schema(&search_signature(), &[], Some(&extension)).unwrap_err();
        assert!(matches!(err, SchemaError::ExtraArgumentsNotAccepted(_)));
    }

    #[test]
    fn test_extension_from_json_schema() {
        let extension = ExtensionSchema::from_json_schema(&json!({
            "type": "object",
            "properties": {"region": {"type": "string", "description": "Region"}},
            "required": ["region"]
        }))
        .unwrap();
        assert_eq!(extension.field_names().collect::<Vec<_>>(), vec!["region"]);

        let err = ExtensionSchema::from_json_schema(&json!("nope")).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidExtension(_)));
    }

    #[test]
    fn test_signature_from_remote_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "Page to open"},
                "wait": {"type": "integer"}
            },
            "required": ["url"]
        });
        let signature = ToolSignature::from_json_schema(
            "navigate",
            "Open a page",
            schema.as_object().unwrap(),
        );
        assert!(signature.is_lenient());
        assert!(signature.declares("url"));
        assert!(signature.declares("wait"));

        let extracted = extract_schema(&signature, &[], None).unwrap();
        assert_eq!(extracted.parameters.required, vec!["url".to_string()]);
        assert_eq!(
            extracted.parameters.properties["url"]["description"],
            "Page to open"
        );
        let wait = &extracted.parameters.properties["wait"];
        assert!(wait.get("description").is_none());
    }

    #[test]
    fn test_remote_definitions_survive_extraction() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "properties": {
                "target": {"$ref": "#/$defs/Point", "description": "Where to move"}
            },
            "required": ["target"],
            "additionalProperties": false,
            "$defs": {
                "Point": {
                    "type": "object",
                    "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
                    "required": ["x", "y"]
                }
            }
        });
        let signature =
            ToolSignature::from_json_schema("move_to", "Move", schema.as_object().unwrap());
        let extracted = extract_schema(&signature, &[], None).unwrap();

        let value = serde_json::to_value(&extracted).unwrap();
        let parameters = &value["parameters"];
        assert_eq!(parameters["properties"]["target"]["$ref"], "#/$defs/Point");
        assert_eq!(parameters["$defs"]["Point"]["required"], json!(["x", "y"]));
        assert_eq!(parameters["additionalProperties"], false);
        assert_eq!(parameters["type"], "object");
        assert_eq!(parameters["required"], json!(["target"]));

        let back: ToolSchema = serde_json::from_value(value).unwrap();
        assert_eq!(back, extracted);
    }

    #[test]
    fn test_local_schema_has_no_extra_keywords() {
        let schema = extract_schema(&search_signature(), &[], None).unwrap();
        let value = serde_json::to_value(&schema).unwrap();
        let keys: Vec<&str> = value["parameters"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 3);

        let pinned = search_signature()
            .keyword("additionalProperties", json!(false))
            .keyword("type", json!("array"));
        let schema = extract_schema(&pinned, &[], None).unwrap();
        assert_eq!(schema.parameters.kind, "object");
        assert_eq!(schema.parameters.extra["additionalProperties"], false);
        assert!(!schema.parameters.extra.contains_key("type"));
    }

    #[test]
    fn test_function_json_wrapper() {
        let schema = extract_schema(&search_signature(), &[], None).unwrap();
        let wrapped = schema.to_function_json();
        assert_eq!(wrapped["type"], "function");
        assert_eq!(wrapped["function"]["name"], "search");
    }
}
