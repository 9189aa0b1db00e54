use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use log::{error, info};

use crate::document::generation::{generate_documents, GenerationRequest};
use crate::document::models::{
    DocumentListResponse, DownloadAllQuery, DownloadQuery, GenerateDocumentsRequest,
    GenerateResponse, GeneratedDocumentInfo,
};
use crate::document::retrieval::{
    attachment_response, build_archive, find_document, guess_content_type, ARCHIVE_NAME,
};
use crate::multipart::MultipartParser;
use crate::storage::Bucket;
use crate::{AppState, ErrorResponse};

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    post,
    path = "/generate",
    request_body(content = inline(GenerateDocumentsRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "At least one document was generated", body = GenerateResponse),
        (status = 400, description = "Missing names, invalid template list or invalid logo", body = ErrorResponse),
        (status = 404, description = "None of the requested templates exist", body = GenerateResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 500, description = "No document could be generated", body = GenerateResponse)
    )
)]
pub async fn generate(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing generate handler");
    let form = match MultipartParser::parse_generate_request(payload, data.config.max_upload_bytes).await
    {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to parse generation request: {}", e);
            return HttpResponse::from(e);
        }
    };

    let request = match GenerationRequest::from_form(form) {
        Ok(request) => request,
        Err(e) => {
            error!("Rejected generation request: {}", e);
            return HttpResponse::from(e);
        }
    };

    match generate_documents(&data, request).await {
        Ok(report) => {
            info!(
                "Generation finished: {} succeeded, {} failed",
                report.documents.len(),
                report.failed.len()
            );
            report.into_response()
        }
        Err(e) => {
            error!("Document generation failed: {}", e);
            HttpResponse::from(e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/documents",
    responses(
        (status = 200, description = "Generated documents, newest first", body = DocumentListResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_documents(data: web::Data<AppState>) -> impl Responder {
    info!("Executing list_documents handler");
    match data.storage.list(Bucket::Generated).await {
        Ok(mut files) => {
            files.sort_by(|a, b| {
                b.last_modified
                    .cmp(&a.last_modified)
                    .then_with(|| a.name.cmp(&b.name))
            });
            let documents: Vec<GeneratedDocumentInfo> =
                files.into_iter().map(GeneratedDocumentInfo::from).collect();
            info!("Returning {} generated documents", documents.len());
            HttpResponse::Ok().json(DocumentListResponse { documents })
        }
        Err(e) => {
            error!("Failed to list generated documents: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to list documents"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/download",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Document content"),
        (status = 400, description = "Missing or invalid filename", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn download_document(
    query: web::Query<DownloadQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing download_document handler");
    match query.into_inner().file {
        Some(name) if !name.is_empty() => send_document(&data, &name).await,
        _ => HttpResponse::BadRequest().json(ErrorResponse::bad_request("File parameter is required")),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/download/{filename}",
    params(
        ("filename" = String, Path, description = "Generated document name")
    ),
    responses(
        (status = 200, description = "Document content"),
        (status = 400, description = "Invalid filename", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn download_document_by_name(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing download_document_by_name handler");
    send_document(&data, &path.into_inner()).await
}

async fn send_document(data: &AppState, name: &str) -> HttpResponse {
    let file = match find_document(data.storage.as_ref(), name).await {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot serve {}: {}", name, e);
            return HttpResponse::from(e);
        }
    };

    match data.storage.read(Bucket::Generated, &file.name).await {
        Ok(bytes) => {
            info!("Serving {} ({} bytes)", file.name, bytes.len());
            attachment_response(&file.name, &guess_content_type(&file.name), bytes)
        }
        Err(e) => {
            error!("Failed to read {}: {}", file.name, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to read document"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/download-all",
    params(DownloadAllQuery),
    responses(
        (status = 200, description = "Zip archive of the requested documents"),
        (status = 400, description = "Missing or invalid files parameter", body = ErrorResponse),
        (status = 404, description = "None of the requested documents exist", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn download_all(
    query: web::Query<DownloadAllQuery>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing download_all handler");
    let Some(raw) = query.into_inner().files else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("Files parameter is required"));
    };
    let paths: Vec<String> = match serde_json::from_str(&raw) {
        Ok(paths) => paths,
        Err(e) => {
            error!("Invalid files parameter: {}", e);
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request("Invalid files parameter"));
        }
    };

    match build_archive(data.storage.as_ref(), &paths).await {
        Ok(bytes) => {
            info!("Serving archive of {} bytes", bytes.len());
            attachment_response(ARCHIVE_NAME, "application/zip", bytes)
        }
        Err(e) => {
            error!("Failed to build archive: {}", e);
            HttpResponse::from(e)
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate").route(web::post().to(generate)))
        .service(web::resource("/documents").route(web::get().to(list_documents)))
        .service(web::resource("/download").route(web::get().to(download_document)))
        .service(web::resource("/download/{filename}").route(web::get().to(download_document_by_name)))
        .service(web::resource("/download-all").route(web::get().to(download_all)));
}
