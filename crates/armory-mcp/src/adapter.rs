//! Conversion of MCP tool results into Armory response chunks

use armory_core::{ContentBlock, ResponseChunk};
use rmcp::model::{CallToolResult, Content, RawContent, ResourceContents};
use serde_json::{Value, json};

/// Metadata key carrying the server's `structuredContent`
pub const STRUCTURED_CONTENT_KEY: &str = "structured_content";

/// Metadata key set when the server flagged the result as an error
pub const IS_ERROR_KEY: &str = "is_error";

/// Convert one MCP content item.
pub fn convert_content(content: &Content) -> ContentBlock {
    match &content.raw {
        RawContent::Text(text) => ContentBlock::text(text.text.clone()),
        RawContent::Image(image) => {
            ContentBlock::image_base64(image.mime_type.clone(), image.data.clone())
        }
        RawContent::Audio(audio) => {
            ContentBlock::audio_base64(audio.mime_type.clone(), audio.data.clone())
        }
        RawContent::Resource(embedded) => match &embedded.resource {
            ResourceContents::TextResourceContents { text, .. } => ContentBlock::text(text.clone()),
            ResourceContents::BlobResourceContents {
                uri,
                mime_type,
                blob,
                ..
            } => ContentBlock::data(json!({
                "uri": uri,
                "mime_type": mime_type,
                "blob": blob,
            })),
        },
        RawContent::ResourceLink(link) => ContentBlock::data(
            serde_json::to_value(link).unwrap_or_else(|_| json!({ "uri": link.uri })),
        ),
    }
}

/// Translate a raw call result into the local chunk shape.
///
/// Content items map one-to-one onto blocks. `structured_content` and an
/// `is_error` flag travel as metadata so that a failed remote call still
/// reaches the agent as readable content.
pub fn wrap_result(result: &CallToolResult) -> ResponseChunk {
    let mut chunk = ResponseChunk::new(result.content.iter().map(convert_content).collect());
    if let Some(structured) = &result.structured_content {
        chunk = chunk.with_metadata(STRUCTURED_CONTENT_KEY, structured.clone());
    }
    if result.is_error == Some(true) {
        chunk = chunk.with_metadata(IS_ERROR_KEY, Value::Bool(true));
    }
    chunk
}

/// Carry an unwrapped result through the dispatch engine as a single data block.
pub fn raw_result_chunk(result: &CallToolResult) -> ResponseChunk {
    ResponseChunk::data(serde_json::to_value(result).unwrap_or(Value::Null))
}
