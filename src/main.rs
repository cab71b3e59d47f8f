use clap::Parser;
use tracing::{error, info};
use ui_harness::{setup_logging, Cli, HarnessConfig, HarnessRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    setup_logging(args.verbose)?;

    info!("Starting ui-harness v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    let runner = HarnessRunner::new(config);

    if let Err(e) = runner.run(args.command).await {
        error!("Harness error: {}", e);
        std::process::exit(1);
    }

    info!("ui-harness finished");
    Ok(())
}

async fn load_config(args: &Cli) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let mut config = if let Some(config_path) = &args.config {
        let content = tokio::fs::read_to_string(config_path).await?;
        serde_json::from_str(&content)?
    } else {
        HarnessConfig::default()
    };

    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    config.validate()?;

    info!("Configuration loaded");
    info!("Screenshots dir: {}", config.screenshots_dir);
    info!("Report dir: {}", config.report_dir);
    info!("Retention: {} days", config.retention_days);

    Ok(config)
}
