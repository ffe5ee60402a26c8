//! HTTP handlers for listings and namespace mutations.
//!
//! Handlers parse form input, delegate to `FileManager`, and answer with a
//! redirect back to the affected listing. Failures come back as JSON
//! `AppError`s.

use super::{
    AppState,
    auth::{MaybeUser, RequireUser},
    views,
};
use crate::{
    errors::AppError,
    services::{
        file_service::Upload,
        identity::Identity,
        paths::{DirPath, FilePath},
    },
};
use axum::{
    body::Body,
    extract::{Form, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddDirectoryForm {
    pub dir_name: String,
    #[serde(default)]
    pub parent_path: String,
}

#[derive(Debug, Deserialize)]
pub struct FileForm {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryForm {
    pub dir_path: String,
}

/// `GET /` — sign-in page, or the root listing for a signed-in user.
pub async fn root(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
) -> Result<Response, AppError> {
    match identity {
        Some(identity) => render_listing(&state, &identity, &DirPath::root()).await,
        None => Ok(Html(views::sign_in_page()).into_response()),
    }
}

/// `GET /directory/{*path}`
pub async fn view_directory(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let dir = DirPath::parse(&path)?;
    render_listing(&state, &identity, &dir).await
}

/// `GET /directory/` — same as the root listing.
pub async fn view_root_directory(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
) -> Result<Response, AppError> {
    render_listing(&state, &identity, &DirPath::root()).await
}

async fn render_listing(
    state: &AppState,
    identity: &Identity,
    dir: &DirPath,
) -> Result<Response, AppError> {
    let profile = state.manager.users.ensure_user(identity).await?;
    let listing = state.manager.lister.list(dir).await?;
    Ok(Html(views::listing_page(&profile, dir, &listing)).into_response())
}

/// `POST /add-directory`
pub async fn add_directory(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    Form(form): Form<AddDirectoryForm>,
) -> Result<Redirect, AppError> {
    let name = form.dir_name.trim();
    let name = name.strip_suffix('/').unwrap_or(name);
    let created = state
        .manager
        .directories
        .create(name, &form.parent_path, Some(&identity.user_id))
        .await?;
    Ok(Redirect::to(&views::directory_url(&created.parent())))
}

/// `POST /upload-file` — multipart with `file_name`, `directory`, `overwrite`.
pub async fn upload_file(
    State(state): State<AppState>,
    RequireUser(identity): RequireUser,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut directory = String::new();
    let mut overwrite = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file_name" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                file = Some((filename, content_type, bytes));
            }
            "directory" => {
                directory = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
            }
            "overwrite" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                overwrite = matches!(value.trim(), "true" | "on" | "1");
            }
            _ => {}
        }
    }

    let Some((filename, content_type, content)) = file.filter(|(name, _, _)| !name.is_empty())
    else {
        return Err(AppError::bad_request("no file provided"));
    };

    let dir = DirPath::parse(&directory)?;
    let target = dir.join_file(&filename)?;
    state
        .manager
        .files
        .upload(Upload {
            content,
            target_path: target.as_str(),
            content_type: content_type.as_deref(),
            overwrite,
            owner: Some(&identity.user_id),
        })
        .await?;
    Ok(Redirect::to(&views::directory_url(&dir)))
}

/// `POST /download-file` — returns the stored bytes as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    RequireUser(_identity): RequireUser,
    Form(form): Form<FileForm>,
) -> Result<Response, AppError> {
    let path = FilePath::parse(&form.filename)?;
    let stored = state.manager.files.download(path.as_str()).await?;

    let mut response = Response::new(Body::from(stored.bytes));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&stored.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!("attachment; filename=\"{}\"", path.name().replace('"', ""));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    Ok(response)
}

/// `POST /delete-file`
pub async fn delete_file(
    State(state): State<AppState>,
    RequireUser(_identity): RequireUser,
    Form(form): Form<FileForm>,
) -> Result<Redirect, AppError> {
    let path = FilePath::parse(&form.filename)?;
    state.manager.files.delete(path.as_str()).await?;
    Ok(Redirect::to(&views::directory_url(&path.parent())))
}

/// `POST /delete-directory`
pub async fn delete_directory(
    State(state): State<AppState>,
    RequireUser(_identity): RequireUser,
    Form(form): Form<DirectoryForm>,
) -> Result<Redirect, AppError> {
    let dir = DirPath::parse(&form.dir_path)?;
    state.manager.directories.delete(dir.as_str()).await?;
    Ok(Redirect::to(&views::directory_url(&dir.parent())))
}
