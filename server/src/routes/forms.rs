//! Form submission route
//!
//! Binds the multipart body to an [`UploadForm`] and hands it to the forms
//! service. Binding failures are rejected before any storage call.

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::models::{AvatarFile, UploadForm, DEFAULT_AVATAR_CONTENT_TYPE};
use axum::extract::{Multipart, State};

pub const FIRST_NAME_FIELD: &str = "firstName";
pub const LAST_NAME_FIELD: &str = "lastName";
pub const EMAIL_FIELD: &str = "email";
pub const GENDER_FIELD: &str = "gender";
pub const PASSWORD_FIELD: &str = "password";
pub const AVATAR_FIELD: &str = "avatar";

/// `POST /form`: store a submission, respond with its record URL
pub async fn post_form(State(state): State<AppState>, multipart: Multipart) -> Result<String> {
    let form = read_form(multipart).await?;
    state.forms_service.save_form(form).await
}

/// Collect the form fields from a multipart body.
///
/// Unknown fields are skipped; a repeated field keeps its last value.
pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut first_name = None;
    let mut last_name = None;
    let mut email = None;
    let mut gender = None;
    let mut password = None;
    let mut avatar = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            FIRST_NAME_FIELD => first_name = Some(field.text().await?),
            LAST_NAME_FIELD => last_name = Some(field.text().await?),
            EMAIL_FIELD => email = Some(field.text().await?),
            GENDER_FIELD => gender = Some(field.text().await?),
            PASSWORD_FIELD => password = Some(field.text().await?),
            AVATAR_FIELD => {
                let file_name = field.file_name().map(str::to_string).ok_or_else(|| {
                    AppError::InvalidForm(format!("field `{}` must be a file", AVATAR_FIELD))
                })?;
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_AVATAR_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await?;

                avatar = Some(AvatarFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => tracing::debug!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(UploadForm {
        first_name: required(first_name, FIRST_NAME_FIELD)?,
        last_name: required(last_name, LAST_NAME_FIELD)?,
        email: required(email, EMAIL_FIELD)?,
        gender: required(gender, GENDER_FIELD)?,
        password: required(password, PASSWORD_FIELD)?,
        avatar: required(avatar, AVATAR_FIELD)?,
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::InvalidForm(format!("missing field `{}`", field)))
}
