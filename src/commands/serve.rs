use std::path::{Path, PathBuf};

use taskdesk::web::{self, ServerConfig};

pub fn run(db_path: &Path, host: String, port: u16, media_dir: Option<PathBuf>) -> anyhow::Result<()> {
    // Make sure the schema exists before the first request arrives.
    super::open_existing(db_path)?;

    let media_root = media_dir.unwrap_or_else(|| {
        db_path
            .parent()
            .map(|p| p.join("media"))
            .unwrap_or_else(|| PathBuf::from("media"))
    });

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(
        db_path,
        ServerConfig {
            host,
            port,
            media_root,
        },
    ))
}
