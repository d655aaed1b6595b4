use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use storybox_core::maintenance::StorageUsage;
use storybox_core::models::{is_draft_id, Photo, QueuedAction, StoryRecord};
use storybox_core::remote::StoryService;
use storybox_core::repository::StoryRepository;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StoryListItem {
    pub id: String,
    pub author: String,
    pub preview: String,
    pub description: String,
    pub created_at: i64,
    pub relative_time: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub draft: bool,
}

#[derive(Debug, Serialize)]
pub struct ActionListItem {
    pub id: i64,
    pub action_type: String,
    pub queued_at: String,
    pub synced: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

pub fn story_to_list_item(story: &StoryRecord) -> StoryListItem {
    StoryListItem {
        id: story.id.clone(),
        author: story.author_name.clone(),
        preview: story_preview(story, 60),
        description: story.description.clone(),
        created_at: story.created_at,
        relative_time: format_relative_time(story.created_at, Utc::now().timestamp_millis()),
        lat: story.lat,
        lon: story.lon,
        draft: story.is_draft,
    }
}

pub fn format_story_lines(stories: &[StoryRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    stories
        .iter()
        .map(|story| {
            let short_id = short_id(&story.id);
            let preview = story_preview(story, 40);
            let relative_time = format_relative_time(story.created_at, now_ms);
            let marker = if story.is_draft { " [draft]" } else { "" };
            format!(
                "{short_id}  {:<12}  {relative_time:<8}  {preview}{marker}",
                story.author_name
            )
        })
        .collect()
}

pub fn format_action_lines(actions: &[QueuedAction]) -> Vec<String> {
    actions
        .iter()
        .map(|action| {
            let status = if action.synced { "synced" } else { "pending" };
            let mut line = format!(
                "#{:<4} {:<10} {:<8} queued {}  attempts={}",
                action.id,
                action.action_type.as_str(),
                status,
                format_timestamp(action.timestamp),
                action.attempts
            );
            if let Some(error) = &action.last_error {
                line.push_str("  last_error=");
                line.push_str(error);
            }
            line
        })
        .collect()
}

pub fn action_to_list_item(action: &QueuedAction) -> ActionListItem {
    ActionListItem {
        id: action.id,
        action_type: action.action_type.as_str().to_string(),
        queued_at: format_timestamp(action.timestamp),
        synced: action.synced,
        attempts: action.attempts,
        last_error: action.last_error.clone(),
    }
}

pub fn format_usage_lines(usage: &StorageUsage) -> Vec<String> {
    let mut lines = usage
        .counts
        .iter()
        .map(|(collection, count)| format!("{:<18} {count}", collection.table()))
        .collect::<Vec<_>>();
    lines.push(format!("{:<18} {}", "total", usage.total_records()));
    if let Some(bytes) = usage.database_bytes {
        lines.push(format!("{:<18} {}", "database size", format_bytes(bytes)));
    }
    lines
}

pub fn story_preview(story: &StoryRecord, max_chars: usize) -> String {
    let collapsed = story
        .preview(usize::MAX)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn short_id(id: &str) -> String {
    if is_draft_id(id) {
        id.to_string()
    } else {
        id.chars().take(13).collect()
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    }
}

pub fn normalize_description(parts: &[String]) -> Result<String, CliError> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyDescription)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_story_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyStoryId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_setting_key(key: &str) -> Result<String, CliError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySettingKey)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Settings values are JSON when they parse as JSON, otherwise plain strings
pub fn parse_setting_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

pub fn photo_mime_type(path: &Path) -> Result<&'static str, CliError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        _ => Err(CliError::UnsupportedPhoto(path.display().to_string())),
    }
}

pub fn read_photo(path: &Path) -> Result<Photo, CliError> {
    let mime_type = photo_mime_type(path)?;
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("photo")
        .to_string();
    Ok(Photo {
        file_name,
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Find a stored story by exact id or unique id prefix
pub async fn resolve_story<S: StoryService>(
    query: &str,
    repo: &StoryRepository<S>,
) -> Result<StoryRecord, CliError> {
    if let Some(story) = repo.story(query).await? {
        return Ok(story);
    }

    let mut matching = repo
        .stories(None)
        .await?
        .into_iter()
        .filter(|story| story.id.starts_with(query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::StoryNotFound(query.to_string())),
        1 => matching
            .pop()
            .ok_or_else(|| CliError::StoryNotFound(query.to_string())),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|story| short_id(&story.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousStoryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn write_output(rendered: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}
