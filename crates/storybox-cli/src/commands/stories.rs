use std::path::Path;

use chrono::Utc;
use storybox_core::models::{MapMarker, NewStory, StoryRecord};
use storybox_core::remote::StoryService;
use storybox_core::repository::{FeedSource, PostOutcome};
use storybox_core::BestEffort;

use crate::commands::common::{
    format_story_lines, format_timestamp, normalize_description, normalize_story_identifier,
    read_photo, resolve_story, story_to_list_item, StoryListItem,
};
use crate::context::AppContext;
use crate::error::CliError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
/// Token source when there is no local store to hold the session
const ACCESS_TOKEN_ENV: &str = "STORYBOX_ACCESS_TOKEN";

pub async fn run_stories(
    context: &AppContext,
    limit: usize,
    cached: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let mut stories = match context.repository("stories") {
        Ok(repo) if cached => repo.stories(Some(limit)).await?,
        Ok(repo) => {
            let feed = repo.fetch_stories().await?;
            if feed.source == FeedSource::Cached {
                eprintln!("Offline: showing cached stories");
            }
            if let BestEffort::Warn(reason) = &feed.mirror {
                eprintln!("Warning: stories were not saved locally ({reason})");
            }
            feed.stories
        }
        Err(CliError::StorageRequired(_)) if !cached => {
            let token = std::env::var(ACCESS_TOKEN_ENV).ok();
            context
                .story_client()
                .fetch_stories_with_location(token.as_deref())
                .await?
                .stories
        }
        Err(error) => return Err(error),
    };
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    stories.truncate(limit);

    print_stories(&stories, as_json)
}

fn print_stories(stories: &[StoryRecord], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let items = stories
            .iter()
            .map(story_to_list_item)
            .collect::<Vec<StoryListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if stories.is_empty() {
        println!("No stories yet.");
    } else {
        for line in format_story_lines(stories) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_show(context: &AppContext, id: &str) -> Result<(), CliError> {
    let id = normalize_story_identifier(id)?;
    let repo = context.repository("show")?;
    let story = resolve_story(&id, &repo).await?;

    println!("id:       {}", story.id);
    println!("author:   {}", story.author_name);
    println!("created:  {}", format_timestamp(story.created_at));
    if let Some(position) = story.coordinates() {
        println!("location: {:.5}, {:.5}", position.lat, position.lon);
    }
    if story.is_draft {
        println!("status:   draft, waiting to sync");
    } else {
        println!("photo:    {}", story.photo_reference);
    }
    println!();
    println!("{}", story.description);
    Ok(())
}

pub async fn run_post(
    context: &AppContext,
    description: &[String],
    photo_path: &Path,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<(), CliError> {
    let description = normalize_description(description)?;
    let photo = read_photo(photo_path)?;
    let repo = context.repository("post")?;

    let outcome = repo
        .post_story(NewStory {
            description,
            photo,
            lat,
            lon,
        })
        .await?;

    match outcome {
        PostOutcome::Published(story) => println!("Published {}", story.id),
        PostOutcome::SavedOffline { draft, action } => {
            println!(
                "Saved {} offline (action #{}); it will sync when you're back online",
                draft.id, action.id
            );
        }
    }
    Ok(())
}

pub async fn run_delete(context: &AppContext, id: &str) -> Result<(), CliError> {
    let id = normalize_story_identifier(id)?;
    let repo = context.repository("delete")?;
    let story = resolve_story(&id, &repo).await?;

    repo.delete_story(&story.id).await?;
    println!("{}", story.id);
    Ok(())
}

pub async fn run_prune(context: &AppContext, older_than_days: u32) -> Result<(), CliError> {
    let repo = context.repository("prune")?;
    let cutoff = prune_cutoff(Utc::now().timestamp_millis(), older_than_days);
    let removed = repo.prune_older_than(cutoff).await?;
    println!("Removed {removed} stories created before {}", format_timestamp(cutoff));
    Ok(())
}

pub fn prune_cutoff(now_ms: i64, older_than_days: u32) -> i64 {
    now_ms.saturating_sub(i64::from(older_than_days).saturating_mul(DAY_MS))
}

pub async fn run_map(context: &AppContext, as_json: bool) -> Result<(), CliError> {
    let markers = context.repository("map")?.markers().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&markers)?);
        return Ok(());
    }
    if markers.is_empty() {
        println!("No stories with a location.");
    }
    for line in format_marker_lines(&markers) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_marker_lines(markers: &[MapMarker]) -> Vec<String> {
    markers
        .iter()
        .map(|marker| {
            format!(
                "{:>10.5} {:>11.5}  {}  {}",
                marker.position.lat, marker.position.lon, marker.story_id, marker.title
            )
        })
        .collect()
}
