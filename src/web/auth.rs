//! Session-cookie authentication for request handlers.
//!
//! Handlers only ever ask one question: who is the authenticated principal
//! of this request, if anyone. `RequireUser` turns "no one" into a redirect
//! to the login page.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::AppState;
use super::errors::AppError;
use crate::db::{Database, DbError};
use crate::models::User;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/login";

/// The authenticated identity behind a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    pub username: String,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal {
            id: user.id,
            username: user.username,
        }
    }
}

/// Anything that can resolve a session key to its principal.
pub trait PrincipalSource {
    fn principal(&self, session_key: &str) -> Result<Option<Principal>, DbError>;
}

impl PrincipalSource for Database {
    fn principal(&self, session_key: &str) -> Result<Option<Principal>, DbError> {
        Ok(self.session_user(session_key)?.map(Principal::from))
    }
}

/// The principal of the request, or `None` for anonymous requests.
pub struct CurrentUser(pub Option<Principal>);

/// The principal of the request; anonymous requests are redirected to login.
pub struct RequireUser(pub Principal);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(key) = session_key(&jar) else {
            return Ok(CurrentUser(None));
        };
        let principal = state.db()?.principal(&key)?;
        Ok(CurrentUser(principal))
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
        principal.map(RequireUser).ok_or(AppError::LoginRequired)
    }
}

pub fn session_key(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(key: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, key))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie matching the session cookie's path, for `CookieJar::remove`.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
