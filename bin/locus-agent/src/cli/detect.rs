use locus_config::GenericConfiguration;
use locus_env::{error::GenericError, EnvironmentDetector};

/// Prints the detected host environment as JSON.
pub fn handle_detect_command(config: &GenericConfiguration) -> Result<(), GenericError> {
    let host = EnvironmentDetector::from_process().detect(config)?;
    println!("{}", serde_json::to_string_pretty(&host)?);
    Ok(())
}
