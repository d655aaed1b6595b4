use std::path::Path;

use storybox_core::util::normalize_text_option;
use storybox_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::context::AppContext;
use crate::error::CliError;

pub fn run_config(context: &AppContext, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            vapid_public_key,
            request_timeout_secs,
        } => {
            let existing = ClientConfig::load_from_path(&context.config_path)?;
            let updated =
                merge_config(existing, api_base_url, vapid_public_key, request_timeout_secs)?;
            save_config(&updated, &context.config_path)?;
            println!("Saved {}", context.config_path.display());
        }
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&context.config)?);
            println!("database: {}", context.db_path.display());
        }
        ConfigCommands::Path => println!("{}", context.config_path.display()),
    }
    Ok(())
}

/// Apply explicit values over the stored file, validating the result
pub fn merge_config(
    mut config: ClientConfig,
    api_base_url: Option<String>,
    vapid_public_key: Option<String>,
    request_timeout_secs: Option<u64>,
) -> Result<ClientConfig, CliError> {
    if let Some(url) = normalize_text_option(api_base_url) {
        config.api_base_url = url;
    }
    if let Some(key) = normalize_text_option(vapid_public_key) {
        config.vapid_public_key = Some(key);
    }
    if let Some(timeout) = request_timeout_secs {
        config.request_timeout_secs = timeout;
    }
    Ok(ClientConfig::parse(&serde_json::to_string(&config)?)?)
}

fn save_config(config: &ClientConfig, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}
