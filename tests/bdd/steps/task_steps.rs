#![allow(deprecated)]
use cucumber::{gherkin::Step, given, then, when};
use reqwest::multipart::{Form, Part};
use taskdesk::models::NewTask;

use super::web_steps::{expand_path, record, url};
use crate::DeskWorld;

/// Bytes of a 1x1 transparent PNG.
const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Build a multipart task form from a `| field | value |` table. A field
/// named `image` attaches TINY_PNG under the given file name.
fn task_form(step: &Step) -> Form {
    let mut form = Form::new();
    if let Some(table) = step.table.as_ref() {
        for row in &table.rows {
            let (name, value) = (row[0].clone(), row[1].clone());
            form = if name == "image" {
                form.part(
                    "image",
                    Part::bytes(TINY_PNG.to_vec())
                        .file_name(value)
                        .mime_str("image/png")
                        .expect("valid mime"),
                )
            } else {
                form.text(name, value)
            };
        }
    }
    form
}

/// Insert a task for `owner` straight into the store.
fn seed_task(world: &mut DeskWorld, owner: &str, title: &str, complete: bool) -> i64 {
    let user_id = world.user_id(owner);
    let task = world
        .database()
        .insert_task(&NewTask {
            user_id,
            title: title.to_string(),
            description: None,
            complete,
            image: None,
            link: None,
        })
        .expect("insert task");
    world.task_ids.insert(title.to_string(), task.id);
    task.id
}

#[given(expr = "{string} has a task {string}")]
async fn user_has_a_task(world: &mut DeskWorld, owner: String, title: String) {
    seed_task(world, &owner, &title, false);
}

#[given(expr = "{string} has a completed task {string}")]
async fn user_has_a_completed_task(world: &mut DeskWorld, owner: String, title: String) {
    seed_task(world, &owner, &title, true);
}

#[given(expr = "{string} has {int} tasks")]
async fn user_has_n_tasks(world: &mut DeskWorld, owner: String, count: usize) {
    for n in 1..=count {
        seed_task(world, &owner, &format!("Task {n:02}"), false);
    }
}

/// Submit the create form as the logged-in user.
#[when("I submit the create form with:")]
async fn i_submit_the_create_form(world: &mut DeskWorld, step: &Step) {
    let request = world
        .http_client
        .post(url(world, "/task-create"))
        .multipart(task_form(step));
    record(world, request).await;
}

/// Submit the create form urlencoded, the way a form without a file input posts.
#[when("I submit the create form urlencoded with:")]
async fn i_submit_the_create_form_urlencoded(world: &mut DeskWorld, step: &Step) {
    let fields: Vec<(String, String)> = step
        .table
        .as_ref()
        .map(|table| {
            table
                .rows
                .iter()
                .map(|row| (row[0].clone(), row[1].clone()))
                .collect()
        })
        .unwrap_or_default();
    let request = world
        .http_client
        .post(url(world, "/task-create"))
        .form(&fields);
    record(world, request).await;
}

/// Submit the update form for the aliased task.
#[when(expr = "I submit the update form for {string} with:")]
async fn i_submit_the_update_form(world: &mut DeskWorld, alias: String, step: &Step) {
    let id = world.task_id(&alias);
    let request = world
        .http_client
        .post(url(world, &format!("/task-update/{id}")))
        .multipart(task_form(step));
    record(world, request).await;
}

#[when(expr = "I delete the task {string}")]
async fn i_delete_the_task(world: &mut DeskWorld, alias: String) {
    let path = expand_path(world, &format!("/task-delete/{{{alias}}}"));
    let request = world.http_client.post(url(world, &path));
    record(world, request).await;
}

/// Remember the newest task of `owner` under `alias`.
#[then(expr = "{string} owns a task titled {string}")]
async fn user_owns_a_task_titled(world: &mut DeskWorld, owner: String, title: String) {
    let owner_id = world.user_id(&owner);
    let tasks = world
        .database()
        .list_tasks(&taskdesk::db::TaskFilter::owned_by(owner_id), 100, 0)
        .expect("list tasks");
    let task = tasks
        .iter()
        .find(|t| t.title.as_deref() == Some(title.as_str()))
        .unwrap_or_else(|| panic!("{owner} has no task titled {title:?}"));
    world.task_ids.insert(title, task.id);
}

#[then(expr = "task {string} is complete")]
async fn task_is_complete(world: &mut DeskWorld, alias: String) {
    assert!(stored_task(world, &alias).complete, "{alias} should be complete");
}

#[then(expr = "task {string} is incomplete")]
async fn task_is_incomplete(world: &mut DeskWorld, alias: String) {
    assert!(!stored_task(world, &alias).complete, "{alias} should be incomplete");
}

#[then(expr = "task {string} no longer exists")]
async fn task_no_longer_exists(world: &mut DeskWorld, alias: String) {
    assert!(find_task(world, &alias).is_none(), "{alias} should be deleted");
}

#[then(expr = "task {string} still exists")]
async fn task_still_exists(world: &mut DeskWorld, alias: String) {
    assert!(find_task(world, &alias).is_some(), "{alias} should still exist");
}

#[then(expr = "task {string} has link {string}")]
async fn task_has_link(world: &mut DeskWorld, alias: String, link: String) {
    assert_eq!(stored_task(world, &alias).link.as_deref(), Some(link.as_str()));
}

#[then(expr = "task {string} has a stored image")]
async fn task_has_a_stored_image(world: &mut DeskWorld, alias: String) {
    let task = stored_task(world, &alias);
    let image = task.image.expect("task has no image");
    assert!(image.starts_with("task_images/"), "unexpected path {image}");
    let media_dir = world.media_dir.as_ref().expect("media_dir not set");
    assert!(media_dir.join(&image).is_file(), "{image} was not written");
}

#[then(expr = "task {string} has no image")]
async fn task_has_no_image(world: &mut DeskWorld, alias: String) {
    assert_eq!(stored_task(world, &alias).image, None);
}

/// Look a task up regardless of owner, through its owner id.
fn find_task(world: &DeskWorld, alias: &str) -> Option<taskdesk::models::Task> {
    let id = world.task_id(alias);
    let db = world.database();
    world
        .user_ids
        .values()
        .find_map(|owner| db.get_task(id, *owner).expect("get task"))
}

fn stored_task(world: &DeskWorld, alias: &str) -> taskdesk::models::Task {
    find_task(world, alias).unwrap_or_else(|| panic!("task {alias} not found"))
}
