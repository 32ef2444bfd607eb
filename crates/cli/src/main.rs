mod config_commands;
mod pack_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    fsbot_structure::ArchiveFormat,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "fsbot",
    version,
    about = "fsbot: file structures, archives and PDFs over Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: ./fsbot.toml, then ~/.config/fsbot/).
    #[arg(long, global = true, env = "FSBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Webhook listener address (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Webhook listener port (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    CheckConfig {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print a documented default config file.
    ConfigTemplate,
    /// Build an archive from a structure file without Telegram.
    Pack {
        /// Path list (one path per line) or `.json` structure file.
        file: PathBuf,
        /// Archive format, `zip` or `tar.gz`; defaults to the file's "format" field, then zip.
        #[arg(long)]
        format: Option<ArchiveFormat>,
        /// Directory the archive is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Base name of the archive.
        #[arg(long, default_value = "structure")]
        name: String,
        /// Identity embedded in the archive name.
        #[arg(long, default_value_t = 0)]
        user: u64,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run_bot(cli: &Cli) -> anyhow::Result<()> {
    let loaded = config_commands::load(cli)?;
    let result = fsbot_config::validate::validate(&loaded.config, loaded.raw.as_ref());
    for d in &result.diagnostics {
        match d.severity {
            fsbot_config::Severity::Error => error!(path = %d.path, "{}", d.message),
            fsbot_config::Severity::Warning => warn!(path = %d.path, "{}", d.message),
            fsbot_config::Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `fsbot check-config` for details",
            result.count(fsbot_config::Severity::Error)
        );
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            on_signal.cancel();
        }
    });

    fsbot_telegram::run(&loaded.config, cancel).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "fsbot starting");
            run_bot(&cli).await
        },
        Some(Commands::CheckConfig { verbose }) => config_commands::check(&cli, *verbose),
        Some(Commands::ConfigTemplate) => {
            let port = cli.port.unwrap_or(8443);
            print!("{}", fsbot_config::template::default_config_template(port));
            Ok(())
        },
        Some(Commands::Pack {
            file,
            format,
            out,
            name,
            user,
        }) => {
            let loaded = config_commands::load(&cli)?;
            let path = pack_commands::pack(
                &loaded.config.structure,
                pack_commands::PackRequest {
                    file,
                    format: *format,
                    out,
                    base_name: name,
                    user: *user,
                },
            )
            .await?;
            println!("{}", path.display());
            Ok(())
        },
    }
}
