use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tempo", about = "tempo — listening-stats dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Override the configured bind address.
        #[arg(long)]
        bind: Option<String>,
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the discovered configuration.
    Check,
    /// Print the effective configuration (secrets redacted).
    Show,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env is the usual home for TEMPO_CLIENT_ID and friends.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Serve { bind, port } => {
            let mut config = tempo_config::discover_and_load();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tempo_gateway::start(config).await
        },
        Commands::Config { action } => handle_config(action),
    }
}

fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    let config = tempo_config::discover_and_load();
    match action {
        ConfigAction::Check => {
            let problems = config.problems();
            if problems.is_empty() {
                info!("config ok");
                println!("config ok");
                return Ok(());
            }
            for problem in &problems {
                println!("problem: {problem}");
            }
            anyhow::bail!("{} config problem(s)", problems.len())
        },
        ConfigAction::Show => {
            // CookieConfig::secret is skip_serializing, so this never prints
            // key material.
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
    }
}
