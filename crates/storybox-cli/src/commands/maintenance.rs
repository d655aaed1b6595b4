use storybox_core::maintenance::{clear_all_data, storage_usage};

use crate::commands::common::format_usage_lines;
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run_usage(context: &AppContext) -> Result<(), CliError> {
    let usage = storage_usage(context.store("usage")?).await?;
    println!("{}", context.db_path.display());
    for line in format_usage_lines(&usage) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_clear(context: &AppContext, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ClearNotConfirmed);
    }
    let removed = clear_all_data(context.store("clear")?).await?;
    println!("Removed {removed} records; push subscription kept");
    Ok(())
}
