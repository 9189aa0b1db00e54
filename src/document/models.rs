use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::StoredFile;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocumentInfo {
    #[schema(example = "Acme_Privacy_Policy_2025-03-04T10-11-12-345Z.docx")]
    pub filename: String,
    pub size: u64,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    #[schema(example = "/api/download/Acme_Privacy_Policy_2025-03-04T10-11-12-345Z.docx")]
    pub download_url: String,
}

impl From<StoredFile> for GeneratedDocumentInfo {
    fn from(file: StoredFile) -> Self {
        let download_url = format!("/api/download/{}", file.name);
        Self {
            filename: file.name,
            size: file.size,
            last_modified: file.last_modified,
            download_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<GeneratedDocumentInfo>,
}

/// A template that could not be turned into a document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FailedTemplate {
    pub id: String,
    pub error: String,
    #[serde(skip)]
    pub not_found: bool,
}

impl FailedTemplate {
    pub fn new(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: error.into(),
            not_found: false,
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            error: format!("Template not found: {id}"),
            id,
            not_found: true,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    /// Generated filenames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    /// Same list as `documents`, kept for older clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_docs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_templates: Option<Vec<FailedTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    pub fn succeeded(documents: Vec<String>, failed: Vec<FailedTemplate>) -> Self {
        Self {
            success: true,
            generated_docs: Some(documents.clone()),
            documents: Some(documents),
            failed_templates: (!failed.is_empty()).then_some(failed),
            error: None,
        }
    }

    pub fn failed(failed: Vec<FailedTemplate>) -> Self {
        Self {
            success: false,
            documents: None,
            generated_docs: None,
            failed_templates: Some(failed),
            error: Some("Failed to generate any documents".to_string()),
        }
    }
}

/// Multipart body of `POST /api/generate`, for documentation only.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentsRequest {
    #[allow(unused)]
    #[schema(example = "Acme Corp")]
    pub company_name: String,
    #[allow(unused)]
    #[schema(example = "Jane Doe")]
    pub owner_name: String,
    #[allow(unused)]
    #[schema(example = r#"["Privacy_Policy","Terms.docx"]"#)]
    pub templates: String,
    #[allow(unused)]
    pub logo: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Generated document name; `id` is accepted as an alias.
    #[serde(alias = "id")]
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadAllQuery {
    /// JSON array of document names or paths.
    pub files: Option<String>,
}
