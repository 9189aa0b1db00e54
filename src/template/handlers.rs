use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use log::{debug, error, info};
use uuid::Uuid;

use crate::generator::common::sanitize_name_component;
use crate::generator::TemplateKind;
use crate::multipart::MultipartParser;
use crate::storage::{Bucket, StorageError};
use crate::template::models::{
    Template, TemplateListResponse, TemplateUploaded, UploadTemplateRequest,
};
use crate::{AppState, ErrorResponse};

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "Templates available for generation", body = TemplateListResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_templates(data: web::Data<AppState>) -> impl Responder {
    info!("Executing list_templates handler");
    match data.storage.list(Bucket::Templates).await {
        Ok(files) => {
            let templates: Vec<Template> = files.iter().filter_map(Template::from_stored).collect();
            info!("Returning {} templates", templates.len());
            HttpResponse::Ok().json(TemplateListResponse { templates })
        }
        Err(e) => {
            error!("Failed to list templates: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to list templates"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates",
    request_body(content = inline(UploadTemplateRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Template stored", body = TemplateUploaded),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn upload_template(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing upload_template handler");
    let form = match MultipartParser::parse_template_upload(payload, data.config.max_upload_bytes).await
    {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to parse template upload: {}", e);
            return HttpResponse::from(e);
        }
    };

    let (name, kind, file) = match (form.name, form.kind, form.file) {
        (Some(name), Some(kind), Some(file)) if !name.trim().is_empty() && !kind.trim().is_empty() => {
            (name.trim().to_string(), kind.trim().to_string(), file)
        }
        _ => {
            error!("Template upload is missing name, type or file");
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request("Missing required fields: name, type, file"));
        }
    };

    let Some(template_kind) = TemplateKind::from_extension(&kind)
        .or_else(|| TemplateKind::from_filename(&file.filename))
    else {
        error!("Unsupported template type '{}' for file '{}'", kind, file.filename);
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(
            "Template type must be docx or txt",
        ));
    };

    if file.data.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request("Template file is empty"));
    }

    let filename = format!(
        "{}_{}.{}",
        sanitize_name_component(&name, "template"),
        Uuid::new_v4(),
        template_kind.extension()
    );
    debug!("Storing template '{}' as {}", name, filename);

    match data.storage.put_new(Bucket::Templates, &filename, file.data).await {
        Ok(()) => {
            info!("Template '{}' uploaded as {}", name, filename);
            HttpResponse::Ok().json(TemplateUploaded {
                id: filename,
                name,
                kind: template_kind.extension().to_string(),
                updated_at: chrono::Utc::now().format("%Y-%m-%d").to_string(),
                message: "Template uploaded successfully".to_string(),
            })
        }
        Err(StorageError::InvalidName(bad)) => {
            error!("Refusing template name {}", bad);
            HttpResponse::BadRequest().json(ErrorResponse::bad_request("Invalid template name"))
        }
        Err(e) => {
            error!("Failed to store template {}: {}", filename, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to upload template"))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/templates")
            .route(web::get().to(list_templates))
            .route(web::post().to(upload_template)),
    );
}
