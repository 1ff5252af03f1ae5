mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Parser)]
#[command(
    name = "taskdesk",
    version,
    about = "Personal task tracker served over HTTP"
)]
struct Cli {
    /// Path to the database file (default: .taskdesk/taskdesk.db in current dir)
    #[arg(long, env = "TASKDESK_DB", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the taskdesk database
    Init,
    /// Run the web server
    Serve {
        /// Address to listen on
        #[arg(long, env = "TASKDESK_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(short, long, env = "TASKDESK_PORT", default_value_t = 8000)]
        port: u16,
        /// Directory for uploaded images (default: media/ next to the database)
        #[arg(long, env = "TASKDESK_MEDIA")]
        media_dir: Option<PathBuf>,
    },
    /// Create a user account
    Adduser {
        /// Login name
        username: String,
        /// Password for the new account
        #[arg(long, env = "TASKDESK_PASSWORD")]
        password: String,
    },
    /// Block an account from logging in
    Deactivate {
        /// Login name
        username: String,
    },
    /// Allow a deactivated account to log in again
    Activate {
        /// Login name
        username: String,
    },
}

/// Log to stderr, filtered by RUST_LOG (default: info).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(|| {
        let mut p = std::env::current_dir().expect("cannot determine current directory");
        p.push(".taskdesk");
        p.push("taskdesk.db");
        p
    });

    let result = match cli.command {
        Commands::Init => commands::init::run(&db_path),
        Commands::Serve {
            host,
            port,
            media_dir,
        } => commands::serve::run(&db_path, host, port, media_dir),
        Commands::Adduser { username, password } => {
            commands::adduser::run(&db_path, &username, &password)
        }
        Commands::Deactivate { username } => commands::active::run(&db_path, &username, false),
        Commands::Activate { username } => commands::active::run(&db_path, &username, true),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
