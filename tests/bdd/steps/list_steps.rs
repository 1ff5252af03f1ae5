#![allow(deprecated)]
use cucumber::{then, when};

use super::web_steps::{body, http_get};
use crate::DeskWorld;

#[when(expr = "I search for {string}")]
async fn i_search_for(world: &mut DeskWorld, term: String) {
    let query = encode_query("search-area", &term);
    http_get(world, &format!("/?{query}")).await;
}

#[when(expr = "I open page {string} of the task list")]
async fn i_open_page(world: &mut DeskWorld, page: String) {
    http_get(world, &format!("/?page={page}")).await;
}

#[then(expr = "the list shows {int} task(s)")]
async fn the_list_shows_n_tasks(world: &mut DeskWorld, expected: usize) {
    let shown = body(world).matches("class=\"task-wrapper\"").count();
    assert_eq!(shown, expected, "body:\n{}", body(world));
}

#[then(expr = "the incomplete count is {int}")]
async fn the_incomplete_count_is(world: &mut DeskWorld, expected: u64) {
    let marker = format!("You have <i>{expected}</i> incomplete task");
    let body = body(world);
    assert!(body.contains(&marker), "expected {marker:?} in body:\n{body}");
}

fn encode_query(key: &str, value: &str) -> String {
    reqwest::Url::parse_with_params("http://localhost/", &[(key, value)])
        .ok()
        .and_then(|u| u.query().map(str::to_string))
        .expect("encode query")
}

#[then(expr = "the search box shows {string}")]
async fn the_search_box_shows(world: &mut DeskWorld, term: String) {
    let expected = format!("value=\"{term}\"");
    let body = body(world);
    assert!(body.contains(&expected), "search term not echoed in body:\n{body}");
}
