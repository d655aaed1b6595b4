//! Story backup rendering.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::StoryRecord;
use crate::util::is_http_url;

/// Name stamped into backup documents
pub const APP_NAME: &str = "Storybox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// JSON backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBackup {
    pub stories: Vec<StoryRecord>,
    pub total_count: usize,
    /// RFC 3339, UTC
    pub export_date: String,
    pub app_name: String,
}

impl StoryBackup {
    pub fn new(stories: &[StoryRecord], exported_at_ms: i64) -> Self {
        Self {
            stories: stories.to_vec(),
            total_count: stories.len(),
            export_date: format_timestamp(exported_at_ms),
            app_name: APP_NAME.to_string(),
        }
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map_or_else(|| timestamp_ms.to_string(), |date| {
            date.to_rfc3339_opts(SecondsFormat::Millis, true)
        })
}

pub fn render_json_export(stories: &[StoryRecord], exported_at_ms: i64) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&StoryBackup::new(stories, exported_at_ms))
}

/// Render stories as Markdown, one section per story.
///
/// Embedded draft photos are omitted; only photo URLs are linked.
#[must_use]
pub fn render_markdown_export(stories: &[StoryRecord], exported_at_ms: i64) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {APP_NAME} export");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} stories, exported {}",
        stories.len(),
        format_timestamp(exported_at_ms)
    );

    for story in stories {
        let _ = writeln!(output);
        let author = if story.author_name.is_empty() {
            "Unknown"
        } else {
            story.author_name.as_str()
        };
        let _ = writeln!(output, "## {author} ({})", format_timestamp(story.created_at));
        let _ = writeln!(output);
        if story.is_draft {
            let _ = writeln!(output, "_Draft, not yet synced_");
            let _ = writeln!(output);
        }
        let _ = writeln!(output, "{}", story.description.trim());
        if let Some(position) = story.coordinates() {
            let _ = writeln!(output);
            let _ = writeln!(output, "Location: {:.5}, {:.5}", position.lat, position.lon);
        }
        if is_http_url(&story.photo_reference) {
            let _ = writeln!(output);
            let _ = writeln!(output, "![photo]({})", story.photo_reference);
        }
    }

    output
}

pub fn render_stories_export(
    stories: &[StoryRecord],
    format: ExportFormat,
    exported_at_ms: i64,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(stories, exported_at_ms),
        ExportFormat::Markdown => Ok(render_markdown_export(stories, exported_at_ms)),
    }
}

/// Deterministic default file name for an export
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("storybox-export-{timestamp_ms}.{}", format.extension())
}
