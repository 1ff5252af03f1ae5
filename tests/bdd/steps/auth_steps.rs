#![allow(deprecated)]
use cucumber::{given, then, when};

use super::common_steps::{PASSWORD, create_user};
use super::web_steps::{http_get, http_post_form};
use crate::DeskWorld;

async fn log_in(world: &mut DeskWorld, username: &str, password: &str) -> u16 {
    http_post_form(
        world,
        "/login",
        &[("username", username), ("password", password)],
    )
    .await
}

/// Create the account if needed and log the scenario's client in as it.
#[given(expr = "I am logged in as {string}")]
async fn i_am_logged_in_as(world: &mut DeskWorld, username: String) {
    if !world.user_ids.contains_key(&username) {
        create_user(world, &username);
    }
    let status = log_in(world, &username, PASSWORD).await;
    assert_eq!(status, 303, "login as '{username}' failed");
    world.current_user = Some(username);
}

#[when(expr = "I log in as {string} with password {string}")]
async fn i_log_in_with_password(world: &mut DeskWorld, username: String, password: String) {
    log_in(world, &username, &password).await;
}

#[when(expr = "I register as {string} with passwords {string} and {string}")]
async fn i_register(world: &mut DeskWorld, username: String, password1: String, password2: String) {
    http_post_form(
        world,
        "/register",
        &[
            ("username", username.as_str()),
            ("password1", password1.as_str()),
            ("password2", password2.as_str()),
        ],
    )
    .await;
}

#[when("I log out")]
async fn i_log_out(world: &mut DeskWorld) {
    http_get(world, "/logout").await;
    world.current_user = None;
}

#[then(expr = "I am signed in as {string}")]
async fn i_am_signed_in_as(world: &mut DeskWorld, username: String) {
    let status = http_get(world, "/").await;
    assert_eq!(status, 200, "expected the task list, not a redirect");
    let body = world.last_response_body.as_deref().unwrap_or_default();
    assert!(
        body.contains(&format!("Hello {username}")),
        "expected a greeting for {username}, body:\n{body}"
    );
}

#[then(expr = "{int} user(s) named {string} exist(s)")]
async fn users_named_exist(world: &mut DeskWorld, expected: usize, username: String) {
    let found = world
        .database()
        .find_user_by_username(&username)
        .expect("query users");
    assert_eq!(usize::from(found.is_some()), expected);
}
