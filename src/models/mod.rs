use chrono::{DateTime, Utc};
use std::fmt;

mod forms;
mod page;

pub use forms::{FormErrors, LoginForm, RegistrationForm, TaskForm};
pub use page::{PAGE_SIZE, Page, PageRequest, page_count};

/// Directory (relative to the media root) that holds uploaded task images.
pub const IMAGE_DIR: &str = "task_images";

#[derive(Debug, Clone)]
pub struct Task {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub complete: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Path of the stored image relative to the media root.
    pub image: Option<String>,
    pub link: Option<String>,
}

impl Task {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Public URL of the stored image, served under `/media`.
    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().map(|path| format!("/media/{path}"))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_title())
    }
}

/// Field values for a task about to be inserted. The owner is always the
/// authenticated requester, never a submitted value.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub image: Option<String>,
    pub link: Option<String>,
}

/// What an update does to the stored image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(String),
}

/// Field values written by the update form. Owner and `created` are not
/// part of it and can never change.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub image: ImageChange,
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Action accepted by the bulk-update endpoint. Anything else is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Complete,
    Incomplete,
}

impl BulkAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "complete" => Some(BulkAction::Complete),
            "incomplete" => Some(BulkAction::Incomplete),
            _ => None,
        }
    }

    /// Value the `complete` flag is overwritten with.
    pub fn complete_flag(self) -> bool {
        matches!(self, BulkAction::Complete)
    }
}
