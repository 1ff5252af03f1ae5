mod steps;

use std::collections::HashMap;
use std::path::PathBuf;

use cucumber::World;

/// Shared state carried through each scenario.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct DeskWorld {
    /// Temporary directory that owns the database file and media root.
    pub db_dir: Option<tempfile::TempDir>,
    /// Path to the SQLite database file inside `db_dir`.
    pub db_path: Option<PathBuf>,
    /// Upload directory handed to the web server.
    pub media_dir: Option<PathBuf>,
    /// Port the in-process server is listening on.
    pub server_port: Option<u16>,
    pub server_handle: Option<tokio::task::JoinHandle<()>>,
    /// Client with a cookie store, so a login sticks for the whole scenario.
    /// Redirects are not followed; steps assert on them.
    pub http_client: reqwest::Client,
    pub last_response_status: Option<u16>,
    pub last_response_location: Option<String>,
    pub last_response_body: Option<String>,
    /// Stderr of the most recent `taskdesk` invocation.
    pub last_stderr: String,
    pub last_exit_code: i32,
    /// Alias to task id, populated by create steps.
    pub task_ids: HashMap<String, i64>,
    /// Username to user id, for accounts created by steps.
    pub user_ids: HashMap<String, i64>,
    /// The user the client is currently logged in as.
    pub current_user: Option<String>,
}

impl DeskWorld {
    fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build http client");
        DeskWorld {
            db_dir: None,
            db_path: None,
            media_dir: None,
            server_port: None,
            server_handle: None,
            http_client,
            last_response_status: None,
            last_response_location: None,
            last_response_body: None,
            last_stderr: String::new(),
            last_exit_code: 0,
            task_ids: HashMap::new(),
            user_ids: HashMap::new(),
            current_user: None,
        }
    }

    /// Open a second connection to the scenario database.
    pub fn database(&self) -> taskdesk::db::Database {
        let db_path = self
            .db_path
            .as_ref()
            .expect("db_path not set, did you forget 'Given a taskdesk database is initialized'?");
        taskdesk::db::Database::open(db_path).expect("failed to open database")
    }

    pub fn task_id(&self, alias: &str) -> i64 {
        *self
            .task_ids
            .get(alias)
            .unwrap_or_else(|| panic!("no task with alias '{alias}'"))
    }

    pub fn user_id(&self, username: &str) -> i64 {
        *self
            .user_ids
            .get(username)
            .unwrap_or_else(|| panic!("no user named '{username}'"))
    }
}

impl Drop for DeskWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

#[tokio::main]
async fn main() {
    DeskWorld::run("tests/features").await;
}
