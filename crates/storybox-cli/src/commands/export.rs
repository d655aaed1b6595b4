use std::path::Path;

use chrono::Utc;
use storybox_core::export::{render_stories_export, ExportFormat as StoryExportFormat};

use crate::cli::ExportFormat;
use crate::commands::common::write_output;
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run_export(
    context: &AppContext,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let stories = context.repository("export")?.stories(None).await?;
    let rendered = render_stories_export(
        &stories,
        export_format(format),
        Utc::now().timestamp_millis(),
    )?;
    write_output(&rendered, output_path)
}

pub const fn export_format(format: ExportFormat) -> StoryExportFormat {
    match format {
        ExportFormat::Json => StoryExportFormat::Json,
        ExportFormat::Markdown => StoryExportFormat::Markdown,
    }
}
