mod relay;

use clap::{Parser, Subcommand};
use courier_channels::telegram::TelegramNetwork;
use courier_core::config::{self, Config};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Courier — Telegram channel relay to webhooks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start relaying until Ctrl-C.
    Start,
    /// Load and validate the config, then print a summary.
    Check,
    /// Print the route table in evaluation order.
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            cfg.validate()?;
            let _guard = init_logging(&cfg);

            let network = Arc::new(TelegramNetwork::new(&cfg.telegram));
            let relay = relay::Relay::new(network, &cfg);
            relay
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("failed to listen for ctrl-c: {e}");
                    }
                })
                .await?;
        }
        Commands::Check => {
            println!("Courier — Config Check\n");
            println!("Config: {}", cli.config);
            println!("Name: {}", cfg.courier.name);
            println!(
                "  telegram: {}",
                if cfg.telegram.bot_token.is_empty() {
                    "missing bot_token"
                } else {
                    "token set"
                }
            );
            if let Some(phone) = &cfg.telegram.phone {
                println!("  phone: {phone}");
            }
            if let Some(session) = &cfg.telegram.session {
                println!("  session: {session}");
            }
            println!("  routes: {}", cfg.routes.len());
            println!(
                "  poll: {} channel(s) every {}s",
                cfg.poll.channels.len(),
                cfg.poll.interval_secs
            );
            println!("  dedup capacity: {}", cfg.dedup.capacity);
            println!();

            match cfg.validate() {
                Ok(()) => println!("OK"),
                Err(e) => anyhow::bail!("{e}"),
            }
        }
        Commands::Routes => {
            if cfg.routes.is_empty() {
                println!("No routes configured.");
            }
            for (i, route) in cfg.routes.iter().enumerate() {
                println!("{:>3}. {} -> {}", i + 1, route.selector, redact(&route.webhook_url));
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stdout always, plus a daily-rolling file
/// when `log_dir` is set. The returned guard must outlive the relay.
fn init_logging(cfg: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.courier.log_level));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &cfg.courier.log_dir {
        Some(dir) => {
            let appender =
                tracing_appender::rolling::daily(config::shellexpand(dir), "courier.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Hide the webhook token (last path segment) when printing.
fn redact(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((base, token)) if !token.is_empty() => format!("{base}/***"),
        _ => url.to_string(),
    }
}
