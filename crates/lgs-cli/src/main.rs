use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lgs")]
#[command(about = "Legislative record generation reconciler", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> state overrides)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Replace the Current generations of a state with scraper output
    Import {
        /// Two-letter state abbreviation (e.g. ct)
        state: String,

        /// Overrides import.data_dir
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Reconcile metadata, legislators and bills of a state into Live
    Merge {
        /// Two-letter state abbreviation (e.g. ct)
        state: String,

        /// Run clock (RFC 3339). Defaults to now; pin it to reproduce a run.
        #[arg(long)]
        now: Option<String>,

        /// Import scraper output first
        #[arg(long, default_value_t = false)]
        import: bool,

        /// Overrides import.data_dir (with --import)
        #[arg(long, requires = "import")]
        data_dir: Option<String>,
    },

    /// Print a Live record by any of its ids
    Lookup {
        /// Two-letter state abbreviation (e.g. ct)
        state: String,

        /// metadata | legislator | bill
        entity: String,

        /// Current or historical stable id
        id: String,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let loaded = commands::load_config(&cli.config_paths)?;
            let pool = commands::connect(&loaded).await?;
            match cmd {
                DbCmd::Status => {
                    let s = lgs_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_generation_tables={}",
                        s.ok, s.has_generation_tables
                    );
                }
                DbCmd::Migrate => {
                    lgs_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = lgs_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Import { state, data_dir } => {
            commands::import::run(&cli.config_paths, &state, data_dir).await?;
        }

        Commands::Merge {
            state,
            now,
            import,
            data_dir,
        } => {
            commands::merge::run(&cli.config_paths, &state, now.as_deref(), import, data_dir)
                .await?;
        }

        Commands::Lookup { state, entity, id } => {
            commands::lookup::run(&cli.config_paths, &state, &entity, &id).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
