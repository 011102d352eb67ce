use clap::{Parser, Subcommand};
use kirby_migrate::{config, migrate, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let on_tag = env!("MIGRATE_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("MIGRATE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "kirby-migrate")]
#[command(about = "Migrate a flat-file content tree into a content store")]
#[command(long_about = "\
Migrate a flat-file content tree into a content store

Every directory holding a <template>.txt record becomes a page. Records are
grouped into one collection per template, field types are inferred from the
values, and pages are created children first so parents can reference them.

Content structure:

  content/
  ├── 1-home/
  │   └── home.txt                 # Record, collection \"home\"
  ├── 2-projects/
  │   ├── projects.txt             # Parent record (children → refs)
  │   └── 1-bridge/
  │       ├── project.txt          # Child record, collection \"project\"
  │       ├── 1-span.jpg           # Uploaded, referenced from `images`
  │       └── 1-span.jpg.txt       # Media metadata, never inserted
  └── drafts/                      # No number prefix = hidden page
      └── article.txt

Record format:

  Title: Bridge
  ----
  Featured: 1                      # \"1\"/\"0\" become booleans
  ----
  Order: 3                         # `order` becomes a number

Run 'kirby-migrate scan content/' to preview without touching the store.
Run 'kirby-migrate gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the tree, publish schemas, and create every record
    Migrate {
        /// Config file (TOML, or JSON by extension)
        config: Option<PathBuf>,
        /// Content directory
        content: Option<PathBuf>,
    },
    /// Show the page tree and inferred schemas without contacting the store
    Scan {
        /// Content directory
        content: PathBuf,
        /// Config file supplying scan and schema settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print inferred collection configs as JSON
    Schema {
        /// Content directory
        content: PathBuf,
        /// Config file supplying scan and schema settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock config with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "kirby_migrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let media_root = std::env::current_dir()?;

    match cli.command {
        Command::Migrate { config, content } => {
            let (Some(config_path), Some(content)) = (config, content) else {
                return Ok(());
            };
            let config = config::load_config(&config_path)?;
            init_thread_pool(&config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_migrate_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = migrate::migrate(&config, &content, &media_root, Some(tx));
            printer.join().ok();
            output::print_report(&result?);
        }
        Command::Scan { content, config } => {
            let config = load_optional_config(config.as_deref())?;
            let plan = migrate::plan(&content, &media_root, &config)?;
            output::print_scan_output(&plan.pages);
            println!();
            output::print_schema_output(&plan.schemas);
        }
        Command::Schema { content, config } => {
            let config = load_optional_config(config.as_deref())?;
            let plan = migrate::plan(&content, &media_root, &config)?;
            println!("{}", output::schema_json(&plan.schemas)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_optional_config(path: Option<&Path>) -> Result<config::MigrateConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => Ok(config::MigrateConfig::default()),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
