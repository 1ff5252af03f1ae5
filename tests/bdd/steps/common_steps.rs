#![allow(deprecated)]
use cucumber::{given, then, when};
use predicates::prelude::*;

use crate::DeskWorld;

/// Password every step-created account uses.
pub const PASSWORD: &str = "correct-horse-42";

/// Initialize a fresh taskdesk database into the world's temp dir.
#[given("a taskdesk database is initialized")]
async fn a_taskdesk_database_is_initialized(world: &mut DeskWorld) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("taskdesk.db");

    assert_cmd::Command::cargo_bin("taskdesk")
        .expect("taskdesk binary not found")
        .env("TASKDESK_DB", &db_path)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    world.media_dir = Some(dir.path().join("media"));
    world.db_path = Some(db_path);
    // Keep the TempDir alive for the lifetime of the scenario.
    world.db_dir = Some(dir);
}

/// Create an account straight through the store, bypassing HTTP.
pub fn create_user(world: &mut DeskWorld, username: &str) -> i64 {
    let db = world.database();
    let mut form = taskdesk::models::RegistrationForm {
        username: username.to_string(),
        password1: PASSWORD.to_string(),
        password2: PASSWORD.to_string(),
    };
    let user = taskdesk::accounts::create_account(&db, &mut form)
        .unwrap_or_else(|e| panic!("failed to create user '{username}': {e}"));
    world.user_ids.insert(username.to_string(), user.id);
    user.id
}

#[given(expr = "a user {string} exists")]
async fn a_user_exists(world: &mut DeskWorld, username: String) {
    create_user(world, &username);
}

/// Run `taskdesk` with the given args against the world's database.
fn run_taskdesk(world: &mut DeskWorld, args: &[&str]) {
    let db_path = world.db_path.as_ref().expect("db_path not set");
    let output = assert_cmd::Command::cargo_bin("taskdesk")
        .expect("taskdesk binary not found")
        .env("TASKDESK_DB", db_path)
        .args(args)
        .output()
        .expect("failed to run taskdesk");
    world.last_stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    world.last_exit_code = output.status.code().unwrap_or(-1);
}

#[when(expr = "I run adduser for {string} with password {string}")]
async fn i_run_adduser(world: &mut DeskWorld, username: String, password: String) {
    run_taskdesk(world, &["adduser", &username, "--password", &password]);
}

#[when(expr = "I run deactivate for {string}")]
async fn i_run_deactivate(world: &mut DeskWorld, username: String) {
    run_taskdesk(world, &["deactivate", &username]);
}

#[when(expr = "I run activate for {string}")]
async fn i_run_activate(world: &mut DeskWorld, username: String) {
    run_taskdesk(world, &["activate", &username]);
}

#[then("the command succeeds")]
async fn the_command_succeeds(world: &mut DeskWorld) {
    assert_eq!(
        world.last_exit_code, 0,
        "expected success, stderr was:\n{}",
        world.last_stderr
    );
}

#[then(expr = "the command fails with {string}")]
async fn the_command_fails_with(world: &mut DeskWorld, expected: String) {
    assert_ne!(world.last_exit_code, 0, "expected the command to fail");
    assert!(
        world.last_stderr.contains(&expected),
        "expected stderr to contain {expected:?}, got:\n{}",
        world.last_stderr
    );
}
