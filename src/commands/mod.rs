pub mod active;
pub mod adduser;
pub mod init;
pub mod serve;

use std::path::Path;

use anyhow::{Context, bail};
use taskdesk::db::Database;

/// Open an existing database, refusing to silently create a new one.
pub fn open_existing(db_path: &Path) -> anyhow::Result<Database> {
    if !db_path.exists() {
        bail!(
            "no database at {} (run `taskdesk init` first)",
            db_path.display()
        );
    }
    let db = Database::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    db.migrate()?;
    Ok(db)
}
