//! JSON endpoints that act on several of the requester's tasks at once.

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::auth::RequireUser;
use super::errors::AppError;
use super::forms::is_multipart;
use crate::models::BulkAction;

const TASK_IDS_FIELD: &str = "task_ids[]";

#[derive(Debug, Default, Deserialize)]
pub struct BulkForm {
    #[serde(rename = "task_ids[]", default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub action: Vec<String>,
}

impl BulkForm {
    /// Submitted ids that parse as integers; the rest are ignored.
    pub fn ids(&self) -> Vec<i64> {
        self.task_ids
            .iter()
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }

    /// The last `action` sent, matching how a repeated key reads elsewhere.
    pub fn action(&self) -> Option<&str> {
        self.action.last().map(String::as_str)
    }

    fn set_field(&mut self, name: &str, value: String) {
        match name {
            TASK_IDS_FIELD => self.task_ids.push(value),
            "action" => self.action.push(value),
            _ => {}
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkStatus {
    pub status: &'static str,
}

impl BulkStatus {
    const SUCCESS: BulkStatus = BulkStatus { status: "success" };
    const ERROR: BulkStatus = BulkStatus { status: "error" };
}

/// A bulk body that could not be read at all.
#[derive(Debug)]
pub struct UnreadableBulkForm(String);

impl IntoResponse for UnreadableBulkForm {
    fn into_response(self) -> Response {
        tracing::debug!(reason = %self.0, "unreadable bulk form");
        (StatusCode::BAD_REQUEST, Json(BulkStatus::ERROR)).into_response()
    }
}

/// Urlencoded or multipart, like any browser form post.
impl FromRequest<AppState> for BulkForm {
    type Rejection = UnreadableBulkForm;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(req.headers()) {
            let Form(form) = Form::<BulkForm>::from_request(req, state)
                .await
                .map_err(|e| UnreadableBulkForm(e.to_string()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| UnreadableBulkForm(e.to_string()))?;
        let mut form = BulkForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| UnreadableBulkForm(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field
                .text()
                .await
                .map_err(|e| UnreadableBulkForm(e.to_string()))?;
            form.set_field(&name, value);
        }
        Ok(form)
    }
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    form: BulkForm,
) -> Result<Json<BulkStatus>, AppError> {
    let ids = form.ids();
    let deleted = state.db()?.bulk_delete(user.id, &ids)?;
    info!(requested = ids.len(), deleted, "bulk delete");
    Ok(Json(BulkStatus::SUCCESS))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    form: BulkForm,
) -> Result<Json<BulkStatus>, AppError> {
    let action = form.action().and_then(BulkAction::parse);
    if let Some(action) = action {
        let ids = form.ids();
        let updated = state
            .db()?
            .bulk_set_complete(user.id, &ids, action.complete_flag())?;
        info!(?action, requested = ids.len(), updated, "bulk update");
    }
    Ok(Json(BulkStatus::SUCCESS))
}

/// Any method other than POST.
pub async fn wrong_method() -> (StatusCode, Json<BulkStatus>) {
    (StatusCode::BAD_REQUEST, Json(BulkStatus::ERROR))
}
