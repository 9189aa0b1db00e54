use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::generator::TemplateKind;
use crate::storage::StoredFile;

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[schema(example = "Privacy_Policy_1b4e28ba-2fa1-11d2-883f-0016d3cca427.docx")]
    pub id: String,
    #[schema(example = "Privacy Policy 1b4e28ba-2fa1-11d2-883f-0016d3cca427")]
    pub name: String,
    #[serde(rename = "type")]
    #[schema(example = "docx")]
    pub kind: String,
    #[schema(example = 18342)]
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl Template {
    /// Only `.docx` and `.txt` files are templates.
    pub fn from_stored(file: &StoredFile) -> Option<Self> {
        let kind = TemplateKind::from_filename(&file.name)?;
        Some(Self {
            id: file.name.clone(),
            name: display_name(&file.name),
            kind: kind.extension().to_string(),
            size: file.size,
            last_modified: file.last_modified,
        })
    }
}

/// Filename without extension, underscores shown as spaces.
pub fn display_name(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    stem.replace('_', " ")
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadTemplateRequest {
    #[allow(unused)]
    #[schema(example = "Privacy Policy")]
    pub name: String,
    #[allow(unused)]
    #[serde(rename = "type")]
    #[schema(example = "docx")]
    pub kind: String,
    #[allow(unused)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUploaded {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(example = "2025-03-14")]
    pub updated_at: String,
    pub message: String,
}
