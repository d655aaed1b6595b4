use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use pretty_assertions::assert_eq;
use storybox_core::models::{PushSubscription, StoryRecord, SubscriptionKeys, SubscriptionRecord};
use storybox_core::push::{PushPlatform, PushState};
use storybox_core::{ClientConfig, DrainReport};

use crate::cli::{Cli, Commands, ExportFormat};
use crate::commands::common::{
    format_bytes, format_relative_time, format_timestamp, normalize_description,
    normalize_setting_key, parse_setting_value, photo_mime_type, resolve_story, story_preview,
};
use crate::commands::config::merge_config;
use crate::commands::export::export_format;
use crate::commands::push::describe_state;
use crate::commands::settings::display_setting;
use crate::commands::stories::prune_cutoff;
use crate::commands::sync::format_drain_report;
use crate::context::{push_handle_path, resolve_db_path, AppContext};
use crate::error::CliError;
use crate::platform::{load_subscription_file, FilePushPlatform};

fn story(id: &str, description: &str) -> StoryRecord {
    StoryRecord {
        id: id.to_string(),
        author_name: "Dimas".into(),
        author_id: None,
        description: description.to_string(),
        photo_reference: "https://story-api.test/images/a.jpg".into(),
        created_at: 1_000,
        lat: None,
        lon: None,
        cached_at: None,
        is_draft: false,
    }
}

fn subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.to_string(),
        keys: SubscriptionKeys {
            p256dh: "p256dh-key".into(),
            auth: "auth-secret".into(),
        },
    }
}

fn test_context(dir: &Path) -> AppContext {
    AppContext::open(
        Some(dir.join("storybox.db")),
        Some(dir.join("config.json")),
        true,
    )
    .unwrap()
}

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn post_accepts_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "storybox", "post", "Hello", "Jakarta", "--photo", "a.jpg", "--lat", "-6.2", "--lon",
        "106.8",
    ])
    .unwrap();

    let Some(Commands::Post {
        description,
        lat,
        lon,
        ..
    }) = cli.command
    else {
        panic!("expected post");
    };
    assert_eq!(description, vec!["Hello", "Jakarta"]);
    assert_eq!(lat, Some(-6.2));
    assert_eq!(lon, Some(106.8));
}

#[test]
fn post_requires_both_coordinates() {
    let result = Cli::try_parse_from(["storybox", "post", "x", "--photo", "a.jpg", "--lat", "1"]);
    assert!(result.is_err());
}

#[test]
fn offline_flag_is_global() {
    let cli = Cli::try_parse_from(["storybox", "sync", "--offline"]).unwrap();
    assert!(cli.offline);
}

#[test]
fn normalize_description_joins_and_trims() {
    let parts = vec!["  sunset".to_string(), "at the beach ".to_string()];
    assert_eq!(normalize_description(&parts).unwrap(), "sunset at the beach");
    assert!(matches!(
        normalize_description(&[" ".to_string()]),
        Err(CliError::EmptyDescription)
    ));
}

#[test]
fn setting_keys_must_not_be_blank() {
    assert!(matches!(
        normalize_setting_key("  "),
        Err(CliError::EmptySettingKey)
    ));
    assert_eq!(normalize_setting_key(" theme ").unwrap(), "theme");
}

#[test]
fn setting_values_parse_as_json_or_string() {
    assert_eq!(parse_setting_value("true"), serde_json::json!(true));
    assert_eq!(parse_setting_value("{\"a\":1}"), serde_json::json!({ "a": 1 }));
    assert_eq!(parse_setting_value("dark mode"), serde_json::json!("dark mode"));
}

#[test]
fn access_token_is_never_displayed() {
    assert_eq!(
        display_setting("accessToken", &serde_json::json!("secret")),
        "<redacted>"
    );
    assert_eq!(display_setting("theme", &serde_json::json!("dark")), "dark");
    assert_eq!(display_setting("count", &serde_json::json!(3)), "3");
}

#[test]
fn story_preview_collapses_whitespace_and_truncates() {
    let story = story("a", "This   is a very long sentence that should be shortened\nsecond line");
    assert_eq!(story_preview(&story, 20), "This is a very lo...");
    assert_eq!(story_preview(&story, 200), "This is a very long sentence that should be shortened");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_bytes_picks_unit() {
    assert_eq!(format_bytes(512), "512 B");
    assert_eq!(format_bytes(2048), "2.0 KiB");
    assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
}

#[test]
fn photo_type_follows_extension() {
    assert_eq!(photo_mime_type(Path::new("a.JPG")).unwrap(), "image/jpeg");
    assert_eq!(photo_mime_type(Path::new("a.png")).unwrap(), "image/png");
    assert!(matches!(
        photo_mime_type(Path::new("notes.txt")),
        Err(CliError::UnsupportedPhoto(_))
    ));
}

#[test]
fn prune_cutoff_counts_whole_days() {
    let day = 24 * 60 * 60 * 1000;
    assert_eq!(prune_cutoff(10 * day, 3), 7 * day);
    assert_eq!(prune_cutoff(day, 0), day);
}

#[test]
fn drain_report_summaries() {
    assert_eq!(format_drain_report(&DrainReport::default()), "Nothing to sync");

    let report = DrainReport {
        attempted: 3,
        synced: 2,
        failed: vec![(7, "HTTP 500: rejected".into())],
        ..DrainReport::default()
    };
    assert_eq!(
        format_drain_report(&report),
        "Synced 2 of 3 actions\n  #7 still pending: HTTP 500: rejected"
    );

    let aborted = DrainReport {
        attempted: 1,
        synced: 1,
        aborted_offline: true,
        ..DrainReport::default()
    };
    assert!(format_drain_report(&aborted).contains("connection lost"));
}

#[test]
fn push_state_descriptions() {
    assert_eq!(describe_state(&PushState::Unsubscribed), "Not subscribed");
    let record = SubscriptionRecord::from_subscription(subscription("https://push.test/1"), 1);
    assert_eq!(
        describe_state(&PushState::Subscribed(record)),
        "Subscribed: https://push.test/1"
    );
}

#[test]
fn export_format_maps_to_core() {
    assert_eq!(export_format(ExportFormat::Markdown).extension(), "md");
    assert_eq!(export_format(ExportFormat::Json).extension(), "json");
}

#[test]
fn merge_config_validates_result() {
    let merged = merge_config(
        ClientConfig::default(),
        Some("https://api.test/v1/".into()),
        Some("  ".into()),
        Some(5),
    )
    .unwrap();
    assert_eq!(merged.api_base_url, "https://api.test/v1");
    assert_eq!(merged.vapid_public_key, None);
    assert_eq!(merged.request_timeout_secs, 5);

    assert!(merge_config(ClientConfig::default(), Some("api.test".into()), None, None).is_err());
}

#[test]
fn db_path_prefers_flag_then_config() {
    let config = ClientConfig {
        db_path: Some(PathBuf::from("/from/config.db")),
        ..ClientConfig::default()
    };
    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/from/flag.db")), &config).unwrap(),
        PathBuf::from("/from/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &config).unwrap(),
        PathBuf::from("/from/config.db")
    );
}

#[test]
fn push_handle_lives_next_to_database() {
    assert_eq!(
        push_handle_path(Path::new("/data/storybox/storybox.db")),
        PathBuf::from("/data/storybox/push-subscription.json")
    );
}

#[test]
fn subscription_file_accepts_browser_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub.json");
    std::fs::write(
        &path,
        r#"{"endpoint":"https://push.test/1","expirationTime":null,"keys":{"p256dh":"p","auth":"a"}}"#,
    )
    .unwrap();

    let parsed = load_subscription_file(&path).unwrap();
    assert_eq!(parsed.endpoint, "https://push.test/1");

    std::fs::write(&path, r#"{"endpoint":"https://push.test/1"}"#).unwrap();
    assert!(load_subscription_file(&path).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn file_platform_tracks_handle() {
    let dir = tempfile::tempdir().unwrap();
    let handle = dir.path().join("nested").join("push.json");
    let platform = FilePushPlatform::new(handle.clone(), Some(subscription("https://push.test/1")));

    assert_eq!(platform.existing_subscription().await.unwrap(), None);
    let created = platform.subscribe(b"key").await.unwrap();
    assert!(handle.exists());
    assert_eq!(platform.existing_subscription().await.unwrap(), Some(created.clone()));

    assert!(!platform
        .unsubscribe(&subscription("https://push.test/other"))
        .await
        .unwrap());
    assert!(platform.unsubscribe(&created).await.unwrap());
    assert!(!handle.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn file_platform_requires_supplied_subscription() {
    let dir = tempfile::tempdir().unwrap();
    let platform = FilePushPlatform::new(dir.path().join("push.json"), None);
    assert!(platform.subscribe(b"key").await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_story_by_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(dir.path());
    let store = context.store("test").unwrap();
    store.put(&story("story-abc123", "one")).await.unwrap();
    store.put(&story("story-abd456", "two")).await.unwrap();
    let repo = context.repository("test").unwrap();

    assert_eq!(
        resolve_story("story-abc", &repo).await.unwrap().id,
        "story-abc123"
    );
    assert_eq!(
        resolve_story("story-abd456", &repo).await.unwrap().id,
        "story-abd456"
    );
    assert!(matches!(
        resolve_story("story-ab", &repo).await,
        Err(CliError::AmbiguousStoryId(_))
    ));
    assert!(matches!(
        resolve_story("missing", &repo).await,
        Err(CliError::StoryNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_context_drafts_posts() {
    let dir = tempfile::tempdir().unwrap();
    let context = test_context(dir.path());
    assert!(!context.connectivity.is_online());

    let photo = dir.path().join("photo.png");
    std::fs::write(&photo, [0x89, b'P', b'N', b'G']).unwrap();
    crate::commands::stories::run_post(
        &context,
        &["Offline".to_string(), "post".to_string()],
        &photo,
        Some(90.0),
        Some(180.0),
    )
    .await
    .unwrap();

    let repo = context.repository("test").unwrap();
    let drafts = repo.drafts().await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].description, "Offline post");
    assert_eq!(repo.outbox().pending().await.unwrap().len(), 1);
}
