use std::path::Path;

use locus_env::{
    error::{generic_error, GenericError},
    ServicesData,
};
use tracing::debug;

/// Writes discovery results as JSON, to the given file or to standard output.
///
/// Files are replaced atomically, so readers never observe a partial result.
pub async fn write_services(data: &ServicesData, output_path: Option<&Path>) -> Result<(), GenericError> {
    let mut rendered = serde_json::to_string_pretty(data)?;
    rendered.push('\n');

    let Some(path) = output_path else {
        print!("{}", rendered);
        return Ok(());
    };

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    tokio::fs::write(&staging, rendered.as_bytes())
        .await
        .map_err(|e| generic_error!("Failed to write discovery results to '{}': {}", path.display(), e))?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|e| generic_error!("Failed to replace discovery results at '{}': {}", path.display(), e))?;

    debug!(output_path = %path.display(), services = data.services().len(), "Wrote discovery results.");
    Ok(())
}
