mod auth_steps;
mod common_steps;
mod list_steps;
mod task_steps;
