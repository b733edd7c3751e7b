mod app;
mod plugin;
mod settings;
mod speedtest;

use anyhow::Result;
use settings::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();

    // stdout is left alone; the host captures plugin stderr into its log.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.filter_directive())),
        )
        .init();

    match app::run_plugin(&settings).await {
        Ok(result) => {
            tracing::debug!(
                download_mbps = result.download_mbps,
                upload_mbps = result.upload_mbps,
                "[INTRSPD] recorded"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "[INTRSPD] could not record result");
            Err(e)
        }
    }
}
