/// Local accounts: password hashing, credential checks, registration.
pub mod accounts;
/// Database layer: open, migrate, users, sessions, task CRUD and bulk updates.
pub mod db;
/// Data types: Task, User, forms, pagination.
pub mod models;
/// Axum-based web server and router.
pub mod web;
