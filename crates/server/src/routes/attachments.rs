#![forbid(unsafe_code)]

//! BOM and document uploads, listing, deletion and download.

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use qc_core::Role;
use qc_storage::{Attachment, AttachmentKind, AttachmentMeta};
use serde_json::{Value, json};

struct UploadForm {
    meta: AttachmentMeta,
    file: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        meta: AttachmentMeta::default(),
        file: None,
    };
    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(ApiError::multipart)?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "wo" | "customerId" | "type" => {
                let text = field.text().await.map_err(ApiError::multipart)?;
                let value = Some(text).filter(|text| !text.is_empty());
                match name.as_str() {
                    "wo" => form.meta.wo = value,
                    "customerId" => form.meta.customer_id = value,
                    _ => form.meta.doc_type = value,
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn labels(kind: AttachmentKind) -> (&'static str, &'static str) {
    match kind {
        AttachmentKind::Bom => ("bom", "BOM"),
        AttachmentKind::Document => ("document", "document"),
    }
}

async fn upload(
    state: AppState,
    user: CurrentUser,
    multipart: Multipart,
    kind: AttachmentKind,
) -> Result<Json<Value>, ApiError> {
    let acting = user.require(Role::Quality)?.clone();
    let (key, label) = labels(kind);
    let context = format!("Error uploading {label}");

    let form = read_form(multipart).await?;
    let Some((filename, bytes)) = form.file else {
        return Err(ApiError::bad_request("No file uploaded"));
    };
    let meta = form.meta;

    let attachment = state
        .blocking(move |services| {
            let stored = services
                .uploads
                .store(&filename, &bytes)
                .map_err(|err| ApiError::upload(&context, err))?;
            let path = stored.path.clone();
            services
                .attachments(kind)
                .add(meta, stored, &acting)
                .map_err(|err| {
                    if let Err(cleanup) = services.uploads.remove(&path) {
                        tracing::warn!(path = %path.display(), error = %cleanup, "orphaned upload");
                    }
                    ApiError::storage(&context, err)
                })
        })
        .await??;
    Ok(Json(json!({"success": true, key: attachment})))
}

pub(crate) async fn upload_bom(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    upload(state, user, multipart, AttachmentKind::Bom).await
}

pub(crate) async fn upload_document(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    upload(state, user, multipart, AttachmentKind::Document).await
}

async fn list(
    state: AppState,
    user: CurrentUser,
    wo: String,
    kind: AttachmentKind,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let (_, label) = labels(kind);
    let rows = state
        .blocking(move |services| services.attachments(kind).list_for_wo(&wo, user.principal()))
        .await?
        .map_err(|err| ApiError::storage(&format!("Error loading {label}s"), err))?;
    Ok(Json(rows))
}

pub(crate) async fn list_boms(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(wo): Path<String>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    list(state, user, wo, AttachmentKind::Bom).await
}

pub(crate) async fn list_documents(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(wo): Path<String>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    list(state, user, wo, AttachmentKind::Document).await
}

/// Drops the record, then its stored file. A file that is already gone does
/// not fail the request.
async fn delete(
    state: AppState,
    user: CurrentUser,
    id: String,
    kind: AttachmentKind,
) -> Result<Json<Value>, ApiError> {
    user.require(Role::Admin)?;
    let (_, label) = labels(kind);
    let context = format!("Error deleting {label}");
    state
        .blocking(move |services| {
            let removed = services
                .attachments(kind)
                .remove(&id)
                .map_err(|err| ApiError::storage(&context, err))?;
            if let Some(attachment) = removed {
                services
                    .uploads
                    .remove(&attachment.filepath)
                    .map_err(|err| ApiError::upload(&context, err))?;
            }
            Ok::<_, ApiError>(())
        })
        .await??;
    Ok(Json(json!({"success": true})))
}

pub(crate) async fn delete_bom(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    delete(state, user, id, AttachmentKind::Bom).await
}

pub(crate) async fn delete_document(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    delete(state, user, id, AttachmentKind::Document).await
}

pub(crate) async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .blocking({
            let filename = filename.clone();
            move |services| services.uploads.resolve(&filename)
        })
        .await?
        .map_err(|err| ApiError::upload("Error downloading file", err))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| ApiError::storage("Error downloading file", err))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((headers, bytes).into_response())
}
