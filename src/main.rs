//! # CMS Harness CLI (`cmsh`)
//!
//! ## Usage
//!
//! ```bash
//! cmsh --config ./config/cmsh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmsh init` | Create the SQLite database and run migrations |
//! | `cmsh infer <file>` | Print the schema inferred from an example payload |
//! | `cmsh schema create` | Infer and store a schema for a site |
//! | `cmsh schema list <site_id>` | List stored schemas for a site |
//! | `cmsh schema show <id>` | Show one stored schema |
//! | `cmsh schema apply <id> <file>` | Coerce exported records with a stored schema |
//! | `cmsh site add/list/remove` | Manage registered sites |
//! | `cmsh site onboard <id>` | Fetch a site's export, store its schema, link it |
//! | `cmsh vectorize <site_id>` | Write a site's content to the vector store |
//! | `cmsh weaviate check` | Vector-store readiness probe |
//! | `cmsh weaviate ensure-class` | Create the content class if missing |
//! | `cmsh serve` | Start the HTTP server |
//! | `cmsh completions <shell>` | Print shell completions |

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cms_harness::progress::ProgressMode;
use cms_harness::{commands, config, migrate, server};

/// CMS Harness CLI: schema inference and content vectorization for CMS
/// migrations.
#[derive(Parser)]
#[command(
    name = "cmsh",
    about = "CMS Harness: schema inference and content vectorization for CMS migrations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cmsh.toml")]
    config: PathBuf,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Infer a schema from an example payload file without storing it.
    Infer {
        /// JSON file: an object, an array of objects, or `{ "structure": [...] }`.
        file: PathBuf,
    },

    /// Manage stored schemas.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },

    /// Manage registered sites.
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },

    /// Vectorize every content node of a registered site.
    Vectorize {
        site_id: i64,

        /// Progress output on stderr. Defaults to `human` on a TTY, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressArg>,
    },

    /// Vector-store administration.
    Weaviate {
        #[command(subcommand)]
        action: WeaviateAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Infer a schema from a payload file and store it.
    Create {
        #[arg(long)]
        site_id: i64,
        #[arg(long)]
        cms_id: i64,
        /// Example payload JSON file.
        #[arg(long)]
        payload: PathBuf,
        #[arg(long)]
        created_by: String,
        #[arg(long)]
        description: Option<String>,
        /// Defaults to `1.0.0`.
        #[arg(long)]
        version: Option<String>,
    },
    /// List schemas stored for a site, newest first.
    List { site_id: i64 },
    /// Show one stored schema.
    Show { id: i64 },
    /// Coerce exported records with a stored schema and print them.
    Apply {
        id: i64,
        /// JSON file holding one record or an array of records.
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SiteAction {
    /// Register a site.
    Add {
        #[arg(long)]
        name: String,
        /// Site base URL; `https://` is assumed when no scheme is given.
        #[arg(long)]
        url: String,
        #[arg(long)]
        cms_id: i64,
    },
    /// List registered sites.
    List,
    /// Remove a site. Its stored schemas are kept.
    Remove { id: i64 },
    /// Fetch the site's bulk export, infer and store a schema, and link it.
    Onboard {
        id: i64,
        #[arg(long)]
        created_by: String,
    },
}

#[derive(Subcommand)]
enum WeaviateAction {
    /// Check that the vector store is reachable and ready.
    Check,
    /// Create the configured content class if it does not exist.
    EnsureClass,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgressArg {
    Off,
    Human,
    Json,
}

impl From<ProgressArg> for ProgressMode {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Off => ProgressMode::Off,
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Commands that don't require config
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "cmsh", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Infer { file } => {
            return commands::run_infer(file);
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Schema { action } => match action {
            SchemaAction::Create {
                site_id,
                cms_id,
                payload,
                created_by,
                description,
                version,
            } => {
                commands::run_schema_create(
                    &cfg,
                    site_id,
                    cms_id,
                    &payload,
                    &created_by,
                    description,
                    version,
                )
                .await?;
            }
            SchemaAction::List { site_id } => commands::run_schema_list(&cfg, site_id).await?,
            SchemaAction::Show { id } => commands::run_schema_show(&cfg, id).await?,
            SchemaAction::Apply { id, file } => {
                commands::run_schema_apply(&cfg, id, &file).await?;
            }
        },
        Commands::Site { action } => match action {
            SiteAction::Add { name, url, cms_id } => {
                commands::run_site_add(&cfg, &name, &url, cms_id).await?;
            }
            SiteAction::List => commands::run_site_list(&cfg).await?,
            SiteAction::Remove { id } => commands::run_site_remove(&cfg, id).await?,
            SiteAction::Onboard { id, created_by } => {
                commands::run_site_onboard(&cfg, id, &created_by).await?;
            }
        },
        Commands::Vectorize { site_id, progress } => {
            let mode = progress
                .map(ProgressMode::from)
                .unwrap_or_else(ProgressMode::default_for_tty);
            commands::run_vectorize(&cfg, site_id, mode).await?;
        }
        Commands::Weaviate { action } => match action {
            WeaviateAction::Check => commands::run_vector_store_check(&cfg).await?,
            WeaviateAction::EnsureClass => commands::run_ensure_class(&cfg).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } | Commands::Infer { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
