use axum::Form;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use tracing::{info, warn};

use super::AppState;
use super::auth::{CurrentUser, LOGIN_PATH, removal_cookie, session_cookie, session_key};
use super::errors::AppError;
use super::handlers::LIST_PATH;
use super::templates::{LoginPage, RegisterPage, render};
use crate::accounts::{self, AccountError};
use crate::db::Database;
use crate::models::{FormErrors, LoginForm, RegistrationForm};

const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Start a fresh session for `user_id`, dropping the one the request came with.
fn start_session(db: &Database, jar: &CookieJar, user_id: i64) -> Result<String, AppError> {
    if let Some(old) = session_key(jar) {
        db.delete_session(&old)?;
    }
    db.touch_last_login(user_id)?;
    Ok(db.create_session(user_id)?)
}

/// Run argon2 work on the blocking pool, away from the async workers and
/// outside the database lock.
async fn off_runtime<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {e}")))
}

/// Create the account and its session. `Ok(Err(..))` carries form errors
/// to redisplay.
async fn register_account(
    state: &AppState,
    jar: &CookieJar,
    form: &mut RegistrationForm,
) -> Result<Result<String, FormErrors>, AppError> {
    let checked = accounts::check_registration(&*state.db()?, form);
    if let Err(e) = checked {
        return account_failure(e);
    }

    let password = form.password1.clone();
    let hash = match off_runtime(move || accounts::hash_password(&password)).await? {
        Ok(hash) => hash,
        Err(e) => return account_failure(e),
    };

    let db = state.db()?;
    match accounts::insert_account(&db, &form.username, &hash) {
        Ok(user) => {
            info!(user = %user.username, "registered");
            Ok(Ok(start_session(&db, jar, user.id)?))
        }
        Err(e) => account_failure(e),
    }
}

fn account_failure<T>(error: AccountError) -> Result<Result<T, FormErrors>, AppError> {
    match error {
        AccountError::Invalid(errors) => Ok(Err(errors)),
        AccountError::Db(e) => Err(e.into()),
        e @ AccountError::Hash(_) => Err(AppError::Internal(e.to_string())),
    }
}

pub async fn login_form(CurrentUser(current): CurrentUser) -> Result<Html<String>, AppError> {
    render(&LoginPage {
        user: current.map(|p| p.username),
        username: String::new(),
        errors: FormErrors::default(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let current = current.map(|p| p.username);
    if let Err(errors) = form.check() {
        return Ok(render(&LoginPage {
            user: current,
            username: form.username,
            errors,
        })?
        .into_response());
    }

    let found = state.db()?.find_user_by_username(&form.username)?;
    let password = form.password.clone();
    let user = off_runtime(move || accounts::verify_login(found, &password)).await?;

    let key = match user {
        Some(user) => {
            info!(user = %user.username, "logged in");
            let db = state.db()?;
            Some(start_session(&db, &jar, user.id)?)
        }
        None => None,
    };

    match key {
        Some(key) => Ok((jar.add(session_cookie(key)), Redirect::to(LIST_PATH)).into_response()),
        None => {
            warn!(username = %form.username, "failed login");
            Ok(render(&LoginPage {
                user: current,
                username: form.username,
                errors: FormErrors::non_field_only(INVALID_LOGIN),
            })?
            .into_response())
        }
    }
}

/// Already signed-in visitors go straight to their task list.
pub async fn register_form(CurrentUser(current): CurrentUser) -> Result<Response, AppError> {
    if current.is_some() {
        return Ok(Redirect::to(LIST_PATH).into_response());
    }
    Ok(render(&RegisterPage {
        user: None,
        username: String::new(),
        errors: FormErrors::default(),
    })?
    .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    jar: CookieJar,
    Form(mut form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    let outcome = register_account(&state, &jar, &mut form).await?;

    match outcome {
        Ok(key) => Ok((jar.add(session_cookie(key)), Redirect::to(LIST_PATH)).into_response()),
        Err(errors) => Ok(render(&RegisterPage {
            user: current.map(|p| p.username),
            username: form.username,
            errors,
        })?
        .into_response()),
    }
}

/// Ends the session whatever the method, then sends the visitor to login.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    if let Some(key) = session_key(&jar) {
        state.db()?.delete_session(&key)?;
        info!("logged out");
    }
    Ok((jar.remove(removal_cookie()), Redirect::to(LOGIN_PATH)).into_response())
}
