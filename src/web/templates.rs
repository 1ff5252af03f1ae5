use askama::Template;
use axum::response::Html;

use super::errors::AppError;
use crate::models::{FormErrors, Page, Task, TaskForm};

pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

#[derive(Template)]
#[template(path = "task_list.html")]
pub struct TaskListPage {
    pub user: Option<String>,
    pub page: Page<Task>,
    /// Incomplete tasks in the (possibly searched) set.
    pub count: u64,
    pub search_input: Option<String>,
    pub updated: bool,
}

#[derive(Template)]
#[template(path = "task_detail.html")]
pub struct TaskDetailPage {
    pub user: Option<String>,
    pub task: Task,
}

#[derive(Template)]
#[template(path = "task_form.html")]
pub struct TaskFormPage {
    pub user: Option<String>,
    pub heading: &'static str,
    pub action: String,
    pub form: TaskForm,
    pub errors: FormErrors,
    pub current_image: Option<String>,
}

#[derive(Template)]
#[template(path = "task_confirm_delete.html")]
pub struct TaskDeletePage {
    pub user: Option<String>,
    pub task: Task,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub user: Option<String>,
    pub username: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub user: Option<String>,
    pub username: String,
    pub errors: FormErrors,
}
