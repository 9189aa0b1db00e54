use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use futures::StreamExt;
use log::debug;

use crate::ErrorResponse;

/// A file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct TemplateUploadForm {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Default)]
pub struct GenerateForm {
    pub company_name: Option<String>,
    pub owner_name: Option<String>,
    pub logo: Option<UploadedFile>,
    /// JSON-encoded array of template identifiers.
    pub templates: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Upload exceeds the limit of {0} bytes")]
    TooLarge(usize),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::TooLarge(_) => HttpResponse::PayloadTooLarge()
                .json(ErrorResponse::new("PayloadTooLarge", &error.to_string())),
            MultipartParseError::IoError(_) => {
                HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&error.to_string()))
            }
            _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string())),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Fields `name`, `type` and `file`.
    pub async fn parse_template_upload(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<TemplateUploadForm, MultipartParseError> {
        let mut form = TemplateUploadForm::default();
        let mut used = 0;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let (name, filename) = field_names(&field)?;

            match name.as_str() {
                "name" => form.name = Some(read_text(&mut field, limit, &mut used).await?),
                "type" => form.kind = Some(read_text(&mut field, limit, &mut used).await?),
                "file" => form.file = read_file(&mut field, filename, limit, &mut used).await?,
                other => {
                    debug!("Ignoring multipart field '{}'", other);
                    drain(&mut field).await?;
                }
            }
        }

        Ok(form)
    }

    /// Fields `companyName`, `ownerName`, `logo` and `templates`.
    pub async fn parse_generate_request(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<GenerateForm, MultipartParseError> {
        let mut form = GenerateForm::default();
        let mut used = 0;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let (name, filename) = field_names(&field)?;

            match name.as_str() {
                "companyName" => {
                    form.company_name = Some(read_text(&mut field, limit, &mut used).await?)
                }
                "ownerName" => form.owner_name = Some(read_text(&mut field, limit, &mut used).await?),
                "templates" => form.templates = Some(read_text(&mut field, limit, &mut used).await?),
                "logo" => form.logo = read_file(&mut field, filename, limit, &mut used).await?,
                other => {
                    debug!("Ignoring multipart field '{}'", other);
                    drain(&mut field).await?;
                }
            }
        }

        Ok(form)
    }
}

fn field_names(field: &Field) -> Result<(String, Option<String>), MultipartParseError> {
    let content_disposition = field
        .content_disposition()
        .ok_or_else(|| MultipartParseError::FieldError("Content disposition not found".to_string()))?;
    let name = content_disposition
        .get_name()
        .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
        .to_string();
    let filename = content_disposition.get_filename().map(|s| s.to_string());
    Ok((name, filename))
}

async fn read_bytes(
    field: &mut Field,
    limit: usize,
    used: &mut usize,
) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        *used += data.len();
        if *used > limit {
            return Err(MultipartParseError::TooLarge(limit));
        }
        buffer.extend_from_slice(&data);
    }
    Ok(buffer)
}

async fn read_text(
    field: &mut Field,
    limit: usize,
    used: &mut usize,
) -> Result<String, MultipartParseError> {
    let bytes = read_bytes(field, limit, used).await?;
    String::from_utf8(bytes).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))
}

/// Browsers send an empty, unnamed part when no file was chosen; that counts as absent.
async fn read_file(
    field: &mut Field,
    filename: Option<String>,
    limit: usize,
    used: &mut usize,
) -> Result<Option<UploadedFile>, MultipartParseError> {
    let data = read_bytes(field, limit, used).await?;
    let filename = filename.unwrap_or_default();
    if data.is_empty() && filename.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadedFile { filename, data }))
}

async fn drain(field: &mut Field) -> Result<(), MultipartParseError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_parse_error_display() {
        let error = MultipartParseError::FieldError("field error".to_string());
        assert_eq!(error.to_string(), "Multipart field error: field error");
        assert_eq!(
            MultipartParseError::TooLarge(10).to_string(),
            "Upload exceeds the limit of 10 bytes"
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let resp: HttpResponse = MultipartParseError::TooLarge(1).into();
        assert_eq!(resp.status(), actix_web::http::StatusCode::PAYLOAD_TOO_LARGE);
        let resp: HttpResponse = MultipartParseError::Utf8Error("bad".into()).into();
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
