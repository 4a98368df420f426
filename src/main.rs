use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tari_kitchen::config::{self, SiteConfig};
use tari_kitchen::state::State;
use tari_kitchen::store::{Store, users};
use tari_kitchen::{auth, seed, web};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "tari-kitchen")]
#[command(about = "Server-rendered recipe and blog site")]
#[command(long_about = "\
Server-rendered recipe and blog site

Categories hold items; every item has a Markdown body, an image and a
generated 300x300 thumbnail. Staff manage content under /admin/.

Settings come from config.toml (all keys optional) and these environment
variables, which take precedence:

  TARI_KITCHEN_DATABASE_PATH   TARI_KITCHEN_BASE_URL   TARI_KITCHEN_BIND
  TARI_KITCHEN_SNS_TOPIC_ARN   TARI_KITCHEN_S3_BUCKET  TARI_KITCHEN_AWS_REGION

Seed directory layout:

  content/
  ├── Soups/                # category
  │   ├── summary.txt       # category summary
  │   ├── cover.jpg         # category image
  │   ├── Tom Yum.md        # item body
  │   ├── Tom Yum.jpg       # item image
  │   └── Tom Yum.txt       # item summary (optional)
  └── Desserts/

Run 'tari-kitchen gen-config' to print a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server
    Serve,
    /// Create missing database tables
    Migrate,
    /// Load categories and items from a content directory
    Seed {
        /// Content directory
        dir: PathBuf,
    },
    /// Create a staff account, or promote an existing one
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let load = || config::load_config(&cli.config);

    match cli.command {
        Command::GenConfig => print!("{}", config::stock_config_toml()),
        Command::Serve => {
            info!("Initializing state...");
            let state = State::new(load()?).await?;
            web::serve(state).await?;
        }
        Command::Migrate => {
            let site_config = load()?;
            let store = open_store(&site_config)?;
            store.migrate()?;
            info!("Database at {} is up to date", site_config.database_path);
        }
        Command::Seed { dir } => {
            let state = State::new(load()?).await?;
            let report = seed::seed(state, &dir).await?;
            println!(
                "Seeded {} categories, {} items ({} skipped)",
                report.categories, report.items, report.skipped
            );
        }
        Command::CreateAdmin {
            username,
            email,
            password,
        } => {
            let store = open_store(&load()?)?;
            let hash = auth::hash_password(&password)?;
            let conn = store.conn()?;
            match users::find_by_username(&conn, &username)? {
                Some(existing) => {
                    users::set_staff(&conn, existing.id, true)?;
                    println!("Promoted {username} to staff");
                }
                None => {
                    users::create(&conn, &username, &email, &hash, true)?;
                    println!("Created staff account {username}");
                }
            }
        }
    }

    Ok(())
}

fn open_store(config: &SiteConfig) -> Result<Store, Box<dyn std::error::Error>> {
    info!("Opening database at {}", config.database_path);
    Ok(Store::open(std::path::Path::new(&config.database_path))?)
}
