use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::Query;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use super::auth::RequireUser;
use super::errors::AppError;
use super::forms::TaskSubmission;
use super::media::store_image;
use super::templates::{TaskDeletePage, TaskDetailPage, TaskFormPage, TaskListPage, render};
use crate::db::TaskFilter;
use crate::models::{FormErrors, ImageChange, NewTask, PageRequest, Task, TaskChanges, TaskForm};

pub const LIST_PATH: &str = "/";
const UPDATED_PATH: &str = "/?updated=true";

/// List query string. Keys are collected as lists so a repeated key keeps
/// its last value instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "search-area", default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub page: Vec<String>,
    #[serde(default)]
    pub updated: Vec<String>,
}

impl ListParams {
    fn last(values: &[String]) -> Option<&str> {
        values.last().map(String::as_str)
    }
}

/// Fetch a task the requester owns; anything else is a 404.
fn load_task(state: &AppState, id: i64, owner: i64) -> Result<Task, AppError> {
    state
        .db()?
        .get_task(id, owner)?
        .ok_or_else(|| AppError::NotFound(format!("task {id}")))
}

/// The requester's tasks, searched and paginated, with the incomplete count.
pub async fn task_list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, AppError> {
    let request = PageRequest::parse(ListParams::last(&params.page)).map_err(AppError::NotFound)?;
    let search = ListParams::last(&params.search).unwrap_or_default();
    let filter = TaskFilter::owned_by(user.id).with_search(Some(search));

    let (page, count) = {
        let db = state.db()?;
        let page = db
            .task_page(&filter, request)?
            .ok_or_else(|| AppError::NotFound("invalid page".to_string()))?;
        (page, db.count_incomplete(&filter)?)
    };

    render(&TaskListPage {
        user: Some(user.username),
        page,
        count,
        search_input: (!search.is_empty()).then(|| search.to_string()),
        updated: ListParams::last(&params.updated) == Some("true"),
    })
}

pub async fn task_detail(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let task = load_task(&state, id, user.id)?;
    render(&TaskDetailPage {
        user: Some(user.username),
        task,
    })
}

fn create_page(username: String, form: TaskForm, errors: FormErrors) -> TaskFormPage {
    TaskFormPage {
        user: Some(username),
        heading: "Create task",
        action: "/task-create".to_string(),
        form,
        errors,
        current_image: None,
    }
}

fn update_page(username: String, task: &Task, form: TaskForm, errors: FormErrors) -> TaskFormPage {
    TaskFormPage {
        user: Some(username),
        heading: "Update task",
        action: format!("/task-update/{}", task.id),
        form,
        errors,
        current_image: task.image_url(),
    }
}

pub async fn task_create_form(RequireUser(user): RequireUser) -> Result<Html<String>, AppError> {
    render(&create_page(
        user.username,
        TaskForm::default(),
        FormErrors::default(),
    ))
}

pub async fn task_create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    TaskSubmission { form, image }: TaskSubmission,
) -> Result<Response, AppError> {
    if let Err(errors) = form.check(image.is_some()) {
        return Ok(render(&create_page(user.username, form, errors))?.into_response());
    }

    let image = match &image {
        Some(upload) => Some(store_image(&state.media_root, upload).await?),
        None => None,
    };
    let new_task = NewTask {
        user_id: user.id,
        title: form.title.unwrap_or_default(),
        description: form.description,
        complete: form.complete,
        image,
        link: form.link,
    };
    let task = state.db()?.insert_task(&new_task)?;
    info!(task_id = task.id, user = %user.username, "task created");

    Ok(Redirect::to(LIST_PATH).into_response())
}

pub async fn task_update_form(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let task = load_task(&state, id, user.id)?;
    let form = TaskForm::from_task(&task);
    render(&update_page(user.username, &task, form, FormErrors::default()))
}

pub async fn task_update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
    TaskSubmission { form, image }: TaskSubmission,
) -> Result<Response, AppError> {
    let existing = load_task(&state, id, user.id)?;
    if let Err(errors) = form.check(image.is_some()) {
        return Ok(render(&update_page(user.username, &existing, form, errors))?.into_response());
    }

    let image = match &image {
        Some(upload) => ImageChange::Replace(store_image(&state.media_root, upload).await?),
        None if form.clear_image => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    let changes = TaskChanges {
        title: form.title.unwrap_or_default(),
        description: form.description,
        complete: form.complete,
        image,
        link: form.link,
    };
    let task = state
        .db()?
        .update_task(id, user.id, &changes)?
        .ok_or_else(|| AppError::NotFound(format!("task {id}")))?;
    info!(task_id = task.id, complete = task.complete, "task updated");

    Ok(Redirect::to(UPDATED_PATH).into_response())
}

pub async fn task_delete_confirm(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let task = load_task(&state, id, user.id)?;
    render(&TaskDeletePage {
        user: Some(user.username),
        task,
    })
}

pub async fn task_delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let deleted = state.db()?.delete_task(id, user.id)?;
    if !deleted {
        return Err(AppError::NotFound(format!("task {id}")));
    }
    info!(task_id = id, "task deleted");
    Ok(Redirect::to(LIST_PATH))
}
