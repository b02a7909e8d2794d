use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Both memory documents of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemoryDto {
    #[schema(value_type = Object)]
    pub short_term: Value,
    #[schema(value_type = Object)]
    pub long_term: Value,
}

/// Top-level keys to set on the long-term document
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct LongTermPatchDto(pub Map<String, Value>);

/// One memory document after a write
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemoryDocumentDto {
    #[schema(value_type = Object)]
    pub document: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActiveUrlRequestDto {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Bare status acknowledgement used by the browser-extension endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusDto {
    pub status: String,
}
