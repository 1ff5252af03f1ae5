use std::path::Path;

use anyhow::bail;
use colored::Colorize;
use taskdesk::accounts::{self, AccountError};
use taskdesk::models::RegistrationForm;

/// Create an account from the shell, under the same rules as registration.
pub fn run(db_path: &Path, username: &str, password: &str) -> anyhow::Result<()> {
    let db = super::open_existing(db_path)?;

    let mut form = RegistrationForm {
        username: username.to_string(),
        password1: password.to_string(),
        password2: password.to_string(),
    };
    match accounts::create_account(&db, &mut form) {
        Ok(user) => {
            println!("{} user {} (id {})", "Created".green(), user.username, user.id);
            Ok(())
        }
        Err(AccountError::Invalid(errors)) => {
            let details: Vec<String> = errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect();
            bail!("invalid account: {}", details.join("; "))
        }
        Err(e) => Err(e.into()),
    }
}
