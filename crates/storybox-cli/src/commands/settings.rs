use storybox_core::db::{SettingsRepository, StoreSettingsRepository};
use storybox_core::models::ACCESS_TOKEN_KEY;

use crate::cli::SettingsCommands;
use crate::commands::common::{normalize_setting_key, parse_setting_value};
use crate::context::AppContext;
use crate::error::CliError;

const REDACTED: &str = "<redacted>";

pub async fn run_settings(context: &AppContext, command: SettingsCommands) -> Result<(), CliError> {
    let settings = StoreSettingsRepository::new(context.store("settings")?.clone());

    match command {
        SettingsCommands::Get { key } => {
            let key = normalize_setting_key(&key)?;
            match settings.get::<serde_json::Value>(&key).await? {
                Some(value) => println!("{}", display_setting(&key, &value)),
                None => println!("(unset)"),
            }
        }
        SettingsCommands::Set { key, value } => {
            let key = normalize_setting_key(&key)?;
            settings.set(&key, &parse_setting_value(&value)).await?;
            println!("{key} updated");
        }
        SettingsCommands::Remove { key } => {
            let key = normalize_setting_key(&key)?;
            if settings.remove(&key).await? {
                println!("{key} removed");
            } else {
                println!("{key} was not set");
            }
        }
        SettingsCommands::List => {
            for (key, value) in settings.all().await? {
                println!("{key} = {}", display_setting(&key, &value));
            }
        }
    }
    Ok(())
}

/// Render a setting value, hiding the access token
pub fn display_setting(key: &str, value: &serde_json::Value) -> String {
    if key == ACCESS_TOKEN_KEY {
        return REDACTED.to_string();
    }
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
