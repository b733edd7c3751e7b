use crate::plugin::{PluginObject, PluginObjects};
use crate::settings::Settings;
use crate::speedtest::native::SpeedtestBinary;
use crate::speedtest::SpeedTestResult;
use anyhow::{Context, Result};

/// One plugin execution: measure, then append exactly one row to the result
/// file. Only a failure to write that file is returned as an error.
pub async fn run_plugin(settings: &Settings) -> Result<SpeedTestResult> {
    tracing::info!("[INTRSPD] In script (Native Binary Optimization)");

    let result = SpeedtestBinary::from_settings(settings).run().await;
    record_result(settings, &result)?;

    Ok(result)
}

fn record_result(settings: &Settings, result: &SpeedTestResult) -> Result<()> {
    let mut objects = PluginObjects::new(settings.result_file());
    objects.add_object(PluginObject::speedtest(result, settings.timezone.now_db()));
    objects
        .write_result_file()
        .with_context(|| format!("writing {}", objects.result_file().display()))?;
    Ok(())
}
