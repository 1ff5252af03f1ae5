use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use taskdesk::db::Database;

pub fn run(db_path: &Path) -> anyhow::Result<()> {
    // Create the database directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let db = Database::open(db_path)?;
    db.migrate()?;
    let previous = db.get_config("version")?;
    db.set_config("version", env!("CARGO_PKG_VERSION"))?;

    if let Some(previous) = previous {
        println!("Existing database from taskdesk {previous}");
    }

    println!(
        "{} taskdesk database at {}",
        "Initialized".green(),
        db_path.display()
    );
    Ok(())
}
