use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileMetadataDto {
    pub file_id: i64,
    pub metadata: BTreeMap<String, String>,
}

/// Key/value pairs to upsert
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UpdateMetadataDto(pub BTreeMap<String, String>);
