//! CLI entry point for marques

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marques::{commands, server, Site};

#[derive(Parser)]
#[command(name = "marques")]
#[command(version)]
#[command(about = "A flat-file CMS with an admin panel and Tera themes", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Start the server
    #[command(alias = "s")]
    Serve {
        /// IP address to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Reload theme templates when they change
        #[arg(short, long)]
        watch: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Compact the data tables
    Compact,

    /// List site information
    List {
        /// Type of content to list (pages, posts, users, navigation, redirects)
        #[arg(default_value = "posts")]
        r#type: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user
    Add {
        username: String,

        /// admin or editor
        #[arg(short, long, default_value = "editor")]
        role: String,

        /// Password (generated when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Reset a user's password
    Passwd {
        username: String,

        /// New password (generated when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "marques=debug,info"
    } else {
        "marques=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            let report = commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
            println!(
                "Admin login: {} / {} (shown once, change it after signing in)",
                report.admin_username, report.admin_password
            );
        }

        Commands::Serve { host, port, watch } => {
            let site = Site::new(&base_dir)?;
            let host = host.unwrap_or_else(|| site.config.server.host.clone());
            let port = port.unwrap_or(site.config.server.port);

            tracing::info!("Starting server at http://{}:{}", host, port);
            server::start(site, &host, port, watch).await?;
        }

        Commands::User { action } => {
            let site = Site::new(&base_dir)?;
            match action {
                UserAction::Add {
                    username,
                    role,
                    password,
                } => commands::user::add(&site, &username, &role, password)?,
                UserAction::Passwd { username, password } => {
                    commands::user::passwd(&site, &username, password)?
                }
            }
        }

        Commands::Compact => {
            let site = Site::new(&base_dir)?;
            let reclaimed = commands::compact::run(&site)?;
            println!("Compacted data tables, reclaimed {} bytes", reclaimed);
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            commands::list::run(&site, &r#type)?;
        }
    }

    Ok(())
}
