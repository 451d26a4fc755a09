use clap::{Parser, Subcommand};
use pgstore::config::{self, Config};
use pgstore::core::db::{normalize, Store};
use pgstore::core::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Inspect and probe a PostgreSQL connection configuration.
#[derive(Parser)]
#[command(name = "pgstore", version, about)]
struct Cli {
    /// Configuration file (defaults to <config_dir>/pgstore/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Connection settings that take precedence over the configuration file.
#[derive(clap::Args)]
struct Overrides {
    #[arg(long, global = true)]
    host: Option<String>,
    #[arg(long, global = true, allow_hyphen_values = true)]
    port: Option<i64>,
    #[arg(long, global = true)]
    user: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
    #[arg(long, global = true)]
    dbname: Option<String>,
    /// Require an encrypted transport
    #[arg(long, global = true)]
    ssl: bool,
    #[arg(long, global = true)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the normalized connection descriptor
    Dsn {
        /// Print the password instead of masking it
        #[arg(long)]
        show_password: bool,
    },
    /// Open a connection, ping the server and close it
    Ping,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        let pg = &mut config.postgres;
        if let Some(host) = self.host {
            pg.host = host;
        }
        if let Some(port) = self.port {
            pg.port = port;
        }
        if let Some(user) = self.user {
            pg.username = user;
        }
        if let Some(password) = self.password {
            pg.password = password;
        }
        if let Some(dbname) = self.dbname {
            pg.dbname = dbname;
        }
        if self.ssl {
            pg.ssl = true;
        }
        if let Some(timezone) = self.timezone {
            pg.timezone = timezone;
        }
    }
}

fn load(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => match config::default_config_path() {
            Some(path) if path.is_file() => config::load_config(path),
            _ => Ok(Config::default()),
        },
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log.filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Dsn { show_password } => {
            let descriptor = normalize(&config.postgres)?;
            if show_password {
                println!("{descriptor}");
            } else {
                println!("{}", descriptor.redacted());
            }
        }
        Command::Ping => {
            let store = Store::open(&config).await?;
            store.ping().await?;
            info!("ping succeeded");
            store.close().await?;
            println!("ok");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pgstore: {e}");
            return ExitCode::FAILURE;
        }
    };
    cli.overrides.apply(&mut config);
    init_logging(&config);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pgstore: {e}");
            ExitCode::FAILURE
        }
    }
}
