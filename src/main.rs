use anyhow::Context;
use clap::Parser;
use cnclink::{
    init_logging, ChannelUiQueue, CommunicationManager, Config, ManagerCallbacks,
    SettingsPersistence, StatusParser, TracingErrorReporter, BUILD_DATE, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Console session with a FluidNC/GRBL controller over TCP
#[derive(Debug, Parser)]
#[command(name = "cnclink", version)]
struct Cli {
    /// Controller host name or IPv4 address
    host: String,

    /// Controller TCP port
    #[arg(short, long, default_value_t = 23)]
    port: u16,

    /// Device id used in messages
    #[arg(long, default_value = "machine")]
    id: String,

    /// Settings file (.toml or .json); defaults to the platform config dir
    #[arg(short, long, env = "CNCLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Do not reconnect after a failed or lost connection
    #[arg(long)]
    no_reconnect: bool,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

fn load_settings(cli: &Cli) -> anyhow::Result<SettingsPersistence> {
    let path = match &cli.config {
        Some(path) if !path.exists() => {
            anyhow::bail!("settings file {} does not exist", path.display())
        }
        Some(path) => path.clone(),
        None => Config::default_path(),
    };
    let mut settings = SettingsPersistence::open(path.clone())
        .with_context(|| format!("loading settings from {}", path.display()))?;

    let config = settings.config_mut();
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.no_reconnect {
        config.connection.auto_reconnect = false;
    }
    config.validate()?;
    Ok(settings)
}

fn console_callbacks() -> ManagerCallbacks {
    ManagerCallbacks::new()
        .on_message(|id, text, level| println!("[{}] {}: {}", level, id, text))
        .on_command_sent(|_, command| println!("> {}", command))
        .on_response(|_, line| {
            if !StatusParser::is_status_report(line) {
                println!("< {}", line);
            }
        })
        .on_connection_status(|id, connected| {
            println!("* {} {}", id, if connected { "online" } else { "offline" })
        })
        .on_telemetry(|_, machine, work| println!("  MPos {}  WPos {}", machine, work))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&settings.config().logging)?;

    tracing::info!("cnclink {} (built {})", VERSION, BUILD_DATE);
    if cli.save_config {
        settings
            .save()
            .with_context(|| format!("saving settings to {}", settings.path().display()))?;
        tracing::info!("Saved settings to {}", settings.path().display());
    }
    let config = settings.into_config();

    let (ui_queue, mut ui_tasks) = ChannelUiQueue::new();
    let manager = CommunicationManager::with_config(
        Arc::new(ui_queue),
        Arc::new(TracingErrorReporter),
        config.connection.clone(),
    )
    .with_callbacks(console_callbacks());

    manager.connect_machine(&cli.id, &cli.host, cli.port)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            more = ui_tasks.run_next() => {
                if !more {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = line.trim();
                match command {
                    "" => {}
                    "quit" | "exit" => break,
                    _ => {
                        manager.send_command(&cli.id, command);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tokio::task::block_in_place(|| manager.disconnect_all());
    ui_tasks.drain();
    Ok(())
}
