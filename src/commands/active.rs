use std::path::Path;

use anyhow::bail;
use colored::Colorize;

/// Allow or block logins for an account. Sessions of an inactive account
/// stop resolving immediately.
pub fn run(db_path: &Path, username: &str, active: bool) -> anyhow::Result<()> {
    let db = super::open_existing(db_path)?;

    let Some(user) = db.find_user_by_username(username)? else {
        bail!("no user named {username}");
    };
    db.set_user_active(user.id, active)?;

    let state = if active {
        "Activated".green()
    } else {
        "Deactivated".yellow()
    };
    println!("{state} user {}", user.username);
    Ok(())
}
