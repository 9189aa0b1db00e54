//! Lookup of generated documents and zip bundling.
//!
//! Every name coming from a client is reduced to a bare file name inside the
//! generated-documents bucket before it touches storage.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use log::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::{validate_file_name, Bucket, ObjectStorage, StorageError, StoredFile};
use crate::ErrorResponse;

pub const ARCHIVE_NAME: &str = "policy_documents.zip";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Invalid filename: {0}")]
    InvalidName(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("None of the requested files could be found")]
    NothingToArchive,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to build archive: {0}")]
    Archive(String),
}

impl From<RetrievalError> for HttpResponse {
    fn from(error: RetrievalError) -> Self {
        match error {
            RetrievalError::InvalidName(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
            }
            RetrievalError::NotFound(_) | RetrievalError::NothingToArchive => {
                HttpResponse::NotFound().json(ErrorResponse::not_found(&error.to_string()))
            }
            RetrievalError::Storage(_) | RetrievalError::Archive(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
        }
    }
}

/// Find a generated document by name: exact first, then ignoring case.
pub async fn find_document(
    storage: &(dyn ObjectStorage + Send + Sync),
    name: &str,
) -> Result<StoredFile, RetrievalError> {
    validate_file_name(name).map_err(|_| RetrievalError::InvalidName(name.to_string()))?;

    if let Some(file) = storage.stat(Bucket::Generated, name).await? {
        return Ok(file);
    }

    let wanted = name.to_lowercase();
    storage
        .list(Bucket::Generated)
        .await?
        .into_iter()
        .find(|f| f.name.to_lowercase() == wanted)
        .ok_or_else(|| RetrievalError::NotFound(name.to_string()))
}

/// Reduce a client path to a file name inside the generated bucket.
///
/// The part after the last `{label}/` is kept; traversal segments, remaining
/// separators and empty names yield `None`.
pub fn relative_document_name(path: &str, label: &str) -> Option<String> {
    if path.contains("..") {
        return None;
    }
    let relative = if label.is_empty() {
        path
    } else {
        let marker = format!("{label}/");
        path.rsplit(marker.as_str()).next().unwrap_or(path)
    };
    validate_file_name(relative).ok()?;
    Some(relative.to_string())
}

/// Zip the requested documents. Unusable or missing entries are skipped.
pub async fn build_archive(
    storage: &(dyn ObjectStorage + Send + Sync),
    paths: &[String],
) -> Result<Vec<u8>, RetrievalError> {
    let label = storage.bucket_label(Bucket::Generated);
    let mut seen = HashSet::new();
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    for path in paths {
        let Some(name) = relative_document_name(path, &label) else {
            warn!("Skipping file with suspicious path: {}", path);
            continue;
        };
        if !seen.insert(name.clone()) {
            debug!("Skipping duplicate archive entry {}", name);
            continue;
        }
        match storage.read(Bucket::Generated, &name).await {
            Ok(bytes) => entries.push((name, bytes)),
            Err(StorageError::NotFound(_)) => warn!("File not found: {}", name),
            Err(e) => return Err(e.into()),
        }
    }

    if entries.is_empty() {
        return Err(RetrievalError::NothingToArchive);
    }

    debug!("Zipping {} documents", entries.len());
    web::block(move || zip_entries(&entries))
        .await
        .map_err(|e| RetrievalError::Archive(e.to_string()))?
}

fn zip_entries(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, RetrievalError> {
    let archive_err = |e: zip::result::ZipError| RetrievalError::Archive(e.to_string());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).map_err(archive_err)?;
        writer
            .write_all(data)
            .map_err(|e| RetrievalError::Archive(e.to_string()))?;
    }
    Ok(writer.finish().map_err(archive_err)?.into_inner())
}

/// Binary attachment response with a type guessed from the file extension.
pub fn attachment_response(filename: &str, content_type: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename.to_string())],
        })
        .body(bytes)
}

pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
