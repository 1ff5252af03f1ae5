use axum::Form;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{HeaderMap, header};

use super::AppState;
use super::errors::AppError;
use super::media::Upload;
use crate::models::TaskForm;

/// A parsed create/update submission: text fields plus an optional image.
/// Read from either a multipart or a urlencoded body; only multipart can
/// carry an image.
#[derive(Debug, Default)]
pub struct TaskSubmission {
    pub form: TaskForm,
    pub image: Option<Upload>,
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

impl FromRequest<AppState> for TaskSubmission {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if is_multipart(req.headers()) {
            let multipart = Multipart::from_request(req, state).await?;
            return read_multipart(multipart).await;
        }

        let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state).await?;
        let mut submission = TaskSubmission::default();
        for (name, value) in &fields {
            submission.form.set_field(name, value);
        }
        Ok(submission)
    }
}

/// Read every multipart field. An `image` field with no file name or no
/// bytes means "no new image".
async fn read_multipart(mut multipart: Multipart) -> Result<TaskSubmission, AppError> {
    let mut submission = TaskSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let bytes = field.bytes().await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                submission.image = Some(Upload { file_name, bytes });
            }
        } else {
            let value = field.text().await?;
            submission.form.set_field(&name, &value);
        }
    }

    Ok(submission)
}
