use clap::Parser;
use guild_search_dl::{Config, PacingConfig, Stage, run_export};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guild-search-dl")]
#[command(about = "Export every message matching a guild search to a JSON file")]
#[command(version)]
struct Cli {
    /// JSON config file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Guild (server) ID to search
    #[arg(short, long)]
    server_id: Option<String>,

    /// Search text
    #[arg(short = 'Q', long)]
    query: Option<String>,

    /// Output file (overwritten)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Account login, usually an email address
    #[arg(long, env = "GUILD_SEARCH_LOGIN")]
    login: Option<String>,

    /// Account password
    #[arg(long, env = "GUILD_SEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Give up after this many search requests
    #[arg(long)]
    max_pages: Option<u32>,

    /// Fixed delay between search requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides
    fn into_config(self) -> guild_search_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(server_id) = self.server_id {
            config.search.server_id = server_id;
        }
        if let Some(query) = self.query {
            config.search.query = query;
        }
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(login) = self.login {
            config.credentials.login = login;
        }
        if let Some(password) = self.password {
            config.credentials.password = password;
        }
        if let Some(max_pages) = self.max_pages {
            config.fetch.max_pages = Some(max_pages);
        }
        if let Some(delay_ms) = self.delay_ms {
            config.fetch.pacing = PacingConfig::Fixed { delay_ms };
        }

        Ok(config)
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    // RUST_LOG wins over the -v/-q flags when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        EnvFilter::new(format!("guild_search_dl={level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(stage = %Stage::Config, error = %e, "Could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run_export(&config).await {
        Ok(summary) => {
            info!(
                messages = summary.messages,
                path = %summary.path.display(),
                "All messages saved"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = %e.stage, error = %e.source, "Run failed");
            ExitCode::FAILURE
        }
    }
}
