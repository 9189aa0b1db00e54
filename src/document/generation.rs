//! Batch document generation.
//!
//! One request produces one document per selected template. Failures are
//! collected per template so a single bad template does not sink the batch.

use std::path::Path;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::document::models::{FailedTemplate, GenerateResponse};
use crate::generator::common::{output_filename, sanitize_name_component, with_suffix};
use crate::generator::{LogoImage, PlaceholderValues, TemplateKind, Validator};
use crate::multipart::{GenerateForm, UploadedFile};
use crate::storage::{Bucket, StorageError};
use crate::template::resolve_template;
use crate::{AppState, ErrorResponse};

/// Attempts at finding a free output name before giving up.
const WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid logo image: {0}")]
    InvalidLogo(String),
    #[error("Could not read templates: {0}")]
    Storage(#[from] StorageError),
}

impl From<GenerationError> for HttpResponse {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Validation(_) | GenerationError::InvalidLogo(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
            }
            GenerationError::Storage(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub company_name: String,
    pub owner_name: String,
    pub logo: Option<UploadedFile>,
    pub templates: Vec<String>,
}

impl GenerationRequest {
    pub fn from_form(form: GenerateForm) -> Result<Self, GenerationError> {
        let templates = match form.templates.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<Vec<String>>(raw)
                .map_err(|e| GenerationError::Validation(format!("Invalid template selection: {e}")))?,
            _ => Vec::new(),
        };

        let request = Self {
            company_name: form.company_name.unwrap_or_default().trim().to_string(),
            owner_name: form.owner_name.unwrap_or_default().trim().to_string(),
            logo: form.logo,
            templates,
        };
        request.validate().map_err(GenerationError::Validation)?;
        Ok(request)
    }
}

impl Validator for GenerationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.company_name.is_empty() || self.owner_name.is_empty() {
            return Err("Company name and owner name are required.".to_string());
        }
        if self.templates.iter().all(|t| t.trim().is_empty()) {
            return Err("No templates selected.".to_string());
        }
        Ok(())
    }
}

/// Result of a batch: produced filenames and per-template failures.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub documents: Vec<String>,
    pub failed: Vec<FailedTemplate>,
}

impl GenerationReport {
    /// True when nothing was produced and every failure was a missing template.
    pub fn all_not_found(&self) -> bool {
        self.documents.is_empty() && !self.failed.is_empty() && self.failed.iter().all(|f| f.not_found)
    }

    pub fn into_response(self) -> HttpResponse {
        if !self.documents.is_empty() {
            return HttpResponse::Ok().json(GenerateResponse::succeeded(self.documents, self.failed));
        }
        if self.all_not_found() {
            HttpResponse::NotFound().json(GenerateResponse::failed(self.failed))
        } else {
            HttpResponse::InternalServerError().json(GenerateResponse::failed(self.failed))
        }
    }
}

pub async fn generate_documents(
    state: &AppState,
    request: GenerationRequest,
) -> Result<GenerationReport, GenerationError> {
    info!(
        "Generating {} document(s) for {}, owner: {}",
        request.templates.len(),
        request.company_name,
        request.owner_name
    );

    let logo = match request.logo {
        Some(upload) => {
            let image = LogoImage::from_bytes(upload.data.clone())
                .map_err(|e| GenerationError::InvalidLogo(e.to_string()))?;
            let (width, height) = image.dimensions();
            debug!("Logo accepted: {}x{} {}", width, height, image.content_type());
            save_logo(state, &upload).await;
            Some(Arc::new(image))
        }
        None => None,
    };

    let candidates: Vec<String> = state
        .storage
        .list(Bucket::Templates)
        .await?
        .into_iter()
        .map(|f| f.name)
        .filter(|name| TemplateKind::from_filename(name).is_some())
        .collect();
    debug!("Found {} candidate templates", candidates.len());

    let values = PlaceholderValues::new(&request.company_name, &request.owner_name);
    let mut report = GenerationReport::default();

    for template_id in request.templates.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        match generate_one(state, template_id, &candidates, &values, logo.clone()).await {
            Ok(filename) => {
                info!("Generated {} from template {}", filename, template_id);
                report.documents.push(filename);
            }
            Err(failed) => {
                error!("Error processing template {}: {}", template_id, failed.error);
                report.failed.push(failed);
            }
        }
    }

    Ok(report)
}

async fn save_logo(state: &AppState, upload: &UploadedFile) {
    let original = Path::new(&upload.filename);
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let mut name = format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_name_component(stem, "logo")
    );
    if let Some(ext) = original.extension().and_then(|e| e.to_str()) {
        name = format!("{}.{}", name, sanitize_name_component(ext, "img"));
    }
    match state.storage.put_new(Bucket::Uploads, &name, upload.data.clone()).await {
        Ok(()) => debug!("Logo saved as {}", name),
        Err(e) => warn!("Could not keep a copy of the uploaded logo: {}", e),
    }
}

async fn generate_one(
    state: &AppState,
    template_id: &str,
    candidates: &[String],
    values: &PlaceholderValues,
    logo: Option<Arc<LogoImage>>,
) -> Result<String, FailedTemplate> {
    let Some(matched) = resolve_template(template_id, candidates) else {
        return Err(FailedTemplate::not_found(template_id));
    };
    let template_name = matched.filename.to_string();
    debug!("Template {} resolved to {} ({:?})", template_id, template_name, matched.tier);

    let fail = |message: String| FailedTemplate::new(template_id, message);

    match state.storage.stat(Bucket::Templates, &template_name).await {
        Ok(Some(file)) if file.size == 0 => return Err(fail("Template file is empty".to_string())),
        Ok(Some(_)) => {}
        Ok(None) => return Err(FailedTemplate::not_found(template_id)),
        Err(e) => return Err(fail(e.to_string())),
    }

    let template = state
        .storage
        .read(Bucket::Templates, &template_name)
        .await
        .map_err(|e| fail(e.to_string()))?;

    let engine = state.engine;
    let render_name = template_name.clone();
    let render_values = values.clone();
    let outcome = web::block(move || {
        engine.render(&render_name, &template, &render_values, logo.as_deref())
    })
    .await
    .map_err(|e| fail(e.to_string()))?
    .map_err(|e| fail(e.to_string()))?;

    if outcome.degraded {
        warn!("{} was copied without substitutions", template_name);
    }

    let base = output_filename(
        &values.company_name,
        &template_name,
        outcome.kind.extension(),
        Utc::now(),
    );
    write_new_document(state, base, outcome.bytes)
        .await
        .map_err(|e| fail(e.to_string()))
}

/// Create-new write; a taken name gets a short random suffix.
async fn write_new_document(
    state: &AppState,
    base: String,
    bytes: Vec<u8>,
) -> Result<String, StorageError> {
    let mut filename = base.clone();
    for _ in 0..WRITE_ATTEMPTS {
        match state.storage.put_new(Bucket::Generated, &filename, bytes.clone()).await {
            Ok(()) => return Ok(filename),
            Err(StorageError::AlreadyExists(_)) => {
                let suffix = Uuid::new_v4().simple().to_string();
                filename = with_suffix(&base, &suffix[..8]);
                debug!("Output name taken, retrying as {}", filename);
            }
            Err(e) => return Err(e),
        }
    }
    Err(StorageError::AlreadyExists(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(company: &str, owner: &str, templates: Option<&str>) -> GenerateForm {
        GenerateForm {
            company_name: Some(company.to_string()),
            owner_name: Some(owner.to_string()),
            logo: None,
            templates: templates.map(str::to_string),
        }
    }

    #[test]
    fn test_from_form_parses_template_list() {
        let request =
            GenerationRequest::from_form(form(" Acme ", "Jane", Some(r#"["a","b.docx"]"#))).unwrap();
        assert_eq!(request.company_name, "Acme");
        assert_eq!(request.templates, vec!["a", "b.docx"]);
    }

    #[test]
    fn test_from_form_rejects_missing_names() {
        let err = GenerationRequest::from_form(form("", "Jane", Some(r#"["a"]"#))).unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
    }

    #[test]
    fn test_from_form_rejects_bad_or_empty_lists() {
        assert!(GenerationRequest::from_form(form("A", "B", Some("not json"))).is_err());
        assert!(GenerationRequest::from_form(form("A", "B", Some("[]"))).is_err());
        assert!(GenerationRequest::from_form(form("A", "B", None)).is_err());
    }

    #[test]
    fn test_report_status_classification() {
        let report = GenerationReport {
            documents: vec![],
            failed: vec![FailedTemplate::not_found("x")],
        };
        assert!(report.all_not_found());
        assert_eq!(report.into_response().status(), actix_web::http::StatusCode::NOT_FOUND);

        let report = GenerationReport {
            documents: vec![],
            failed: vec![FailedTemplate::not_found("x"), FailedTemplate::new("y", "boom")],
        };
        assert_eq!(
            report.into_response().status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );

        let report = GenerationReport {
            documents: vec!["a.docx".into()],
            failed: vec![FailedTemplate::new("y", "boom")],
        };
        assert_eq!(report.into_response().status(), actix_web::http::StatusCode::OK);
    }
}
