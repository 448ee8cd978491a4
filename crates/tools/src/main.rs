use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tools::replay::{Session, run_session};
use tracing::info;
use tracing_subscriber::EnvFilter;
use widget::WidgetConfig;

#[derive(Parser)]
#[command(name = "pinpoint", about = "Headless tooling for the pinpoint map widget")]
struct Cli {
    /// Widget configuration (JSON). Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scripted click session and print the event trace.
    Replay { session: PathBuf },
    /// Print the provider script URL for the configuration.
    Url,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Command::Replay { session } => cmd_replay(cli.config.as_deref(), &session),
        Command::Url => cmd_url(cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>, api_key_fallback: Option<&str>) -> Result<WidgetConfig, String> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| format!("{}: {e}", p.display()))?;
            serde_json::from_str::<WidgetConfig>(&text).map_err(|e| format!("{}: {e}", p.display()))?
        }
        None => WidgetConfig::default(),
    };
    cfg.apply_lookup(|k| std::env::var(k).ok())
        .map_err(|e| e.to_string())?;
    if cfg.api_key.trim().is_empty()
        && let Some(key) = api_key_fallback
    {
        cfg.api_key = key.to_string();
    }
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

fn cmd_replay(config: Option<&Path>, session_path: &Path) -> Result<(), String> {
    // The headless service never contacts the provider, so any key will do.
    let cfg = load_config(config, Some("headless"))?;
    let text = std::fs::read_to_string(session_path)
        .map_err(|e| format!("{}: {e}", session_path.display()))?;
    let session = Session::from_json_str(&text).map_err(|e| e.to_string())?;
    info!("replaying {} steps from {}", session.steps.len(), session_path.display());

    let replay = run_session(cfg, &session).map_err(|e| e.to_string())?;
    for event in &replay.events {
        println!("{event}");
    }
    println!("point markers: {}", replay.point_markers);
    match replay.view.distance_sentence {
        Some(sentence) => println!("{sentence}"),
        None => println!("no distance computed"),
    }
    Ok(())
}

fn cmd_url(config: Option<&Path>) -> Result<(), String> {
    let cfg = load_config(config, None)?;
    println!("{}", cfg.binding_request().url());
    Ok(())
}
