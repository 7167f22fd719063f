//! CLI entry point for inkpress

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::Site;

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(version)]
#[command(about = "A static site generator for front-matter markdown and layouts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
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

    /// Create a new markdown document
    New {
        /// Layout to record in the front-matter
        #[arg(short, long)]
        layout: Option<String>,

        /// Title of the new document
        title: String,
    },

    /// Render the site into the output directory
    #[command(alias = "b")]
    Build {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,

        /// Also render documents marked `published: false`
        #[arg(long)]
        drafts: bool,
    },

    /// Build and serve the site locally
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,

        /// Also render documents marked `published: false`
        #[arg(long)]
        drafts: bool,
    },

    /// Delete the output directory
    Clean,

    /// List site information
    List {
        /// Type of content to list (page, layout)
        #[arg(default_value = "page")]
        r#type: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}

/// Load the site, applying the `--drafts` override
fn load_site(base_dir: &Path, drafts: bool) -> Result<Site> {
    let mut site = Site::new(base_dir)?;
    if drafts {
        site.config.render_drafts = true;
    }
    Ok(site)
}

/// Build once and report per-document failures
fn build(site: &Site) -> Result<bool> {
    let report = site.build()?;
    for failure in &report.failures {
        eprintln!("error: {}: {}", failure.source, failure.error);
    }
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "inkpress=debug,info"
    } else {
        "inkpress=info"
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
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            inkpress::commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New { layout, title } => {
            let site = Site::new(&base_dir)?;
            let path = site.new_document(&title, layout.as_deref())?;
            println!("Created: {:?}", path);
        }

        Commands::Build { watch, drafts } => {
            let site = load_site(&base_dir, drafts)?;
            tracing::info!("Building site...");

            let ok = build(&site)?;
            if ok {
                println!("Built successfully!");
            }

            if watch {
                tracing::info!("Watching for file changes...");
                inkpress::commands::build::watch(&site).await?;
            } else if !ok {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Serve {
            port,
            ip,
            open,
            r#static,
            drafts,
        } => {
            let site = load_site(&base_dir, drafts)?;

            // Build first; failed documents are reported but do not stop the server
            tracing::info!("Building site...");
            build(&site)?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            inkpress::server::start(&site, &ip, port, !r#static, open).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Cleaning output folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type, json } => {
            let site = Site::new(&base_dir)?;
            inkpress::commands::list::run(&site, &r#type, json)?;
        }

        Commands::Version => {
            println!("inkpress version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(ExitCode::SUCCESS)
}
