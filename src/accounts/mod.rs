//! Local accounts: argon2 password hashes, credential checks, registration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{FormErrors, RegistrationForm, User};

/// Real argon2 hash of a throwaway password, verified against when the
/// username is unknown so both failure paths cost the same.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$9QsJRKgzJkKaOUvlp7gl2Q$qmE3qIFBNJ6nZYbLYXEI2uo0zZc7T0Q8LU1ZsqsZ3QE";

const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid registration form")]
    Invalid(FormErrors),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check a password against a looked-up account. Unknown users, wrong
/// passwords and inactive accounts all come back as `None`. Runs the full
/// argon2 verification, so callers on an async runtime should move it off
/// the worker threads.
pub fn verify_login(user: Option<User>, password: &str) -> Option<User> {
    let hash = user
        .as_ref()
        .map(|u| u.password_hash.as_str())
        .unwrap_or(DUMMY_HASH);
    let valid = verify_password(password, hash);

    user.filter(|u| valid && u.is_active)
}

/// Field rules plus username uniqueness. Trims the submitted username.
pub fn check_registration(db: &Database, form: &mut RegistrationForm) -> Result<(), AccountError> {
    let mut errors = match form.check() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors,
    };
    if errors.for_field("username").is_empty() && db.username_taken(&form.username)? {
        errors.add("username", USERNAME_TAKEN);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AccountError::Invalid(errors))
    }
}

/// Store an account whose password is already hashed.
pub fn insert_account(db: &Database, username: &str, password_hash: &str) -> Result<User, AccountError> {
    match db.insert_user(username, password_hash) {
        Ok(user) => Ok(user),
        // Lost a race with a concurrent registration.
        Err(DbError::UsernameTaken(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            Err(AccountError::Invalid(errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate a registration form and create the account in one go.
pub fn create_account(db: &Database, form: &mut RegistrationForm) -> Result<User, AccountError> {
    check_registration(db, form)?;
    let hash = hash_password(&form.password1)?;
    insert_account(db, &form.username, &hash)
}
