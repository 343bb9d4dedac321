//! Trading Robot headless console - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Trading Robot headless console
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ROBOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Log in as this user at start
    #[arg(short, long, requires = "password")]
    username: Option<String>,

    /// Password for --username
    #[arg(short, long, requires = "username")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection
    robot_ws::init_crypto();

    let args = Args::parse();

    robot_telemetry::init_logging()?;

    info!("Starting Trading Robot console v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.or_else(|| std::env::var("ROBOT_CONFIG").ok());
    info!(
        config_path = config_path.as_deref().unwrap_or(robot_console::config::DEFAULT_CONFIG_PATH),
        "Loading configuration"
    );
    let config = robot_console::AppConfig::load(config_path.as_deref())?;

    let mut app = robot_console::Application::new(config)?;
    if let (Some(username), Some(password)) = (args.username, args.password) {
        app = app.with_credentials(username, password);
    }

    app.start().await?;
    app.run().await?;

    Ok(())
}
