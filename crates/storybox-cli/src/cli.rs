use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "storybox")]
#[command(about = "Share short photo stories, online or off")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the access token locally
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create a new account
    Register {
        #[arg(long, value_name = "NAME")]
        name: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Refresh and list stories
    #[command(alias = "list")]
    Stories {
        /// Number of stories to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Read the local mirror without contacting the server
        #[arg(long)]
        cached: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one stored story
    Show {
        /// Story ID or unique ID prefix
        id: String,
    },
    /// Post a story; saved as a draft when offline
    #[command(alias = "add")]
    Post {
        /// Story text
        description: Vec<String>,
        /// Photo file (JPEG, PNG, GIF or WebP, at most 1 MiB)
        #[arg(long, value_name = "PATH")]
        photo: PathBuf,
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },
    /// Delete a stored story
    Delete {
        /// Story ID or unique ID prefix
        id: String,
    },
    /// Delete mirrored stories older than a number of days
    Prune {
        #[arg(long, value_name = "DAYS")]
        older_than_days: u32,
    },
    /// List map markers for stored stories
    Map {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect queued offline actions
    Outbox {
        /// Include synced actions awaiting pruning
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay queued actions once
    Sync,
    /// Check connectivity and sync whenever it returns
    Watch {
        /// Seconds between connectivity checks
        #[arg(long, default_value = "30", value_name = "SECS")]
        interval: u64,
    },
    /// Read and write local settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Show local storage usage
    Usage,
    /// Remove every cached story, draft, queued action and setting
    Clear {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
    /// Export stored stories
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Manage the push notification subscription
    Push {
        #[command(subcommand)]
        command: PushCommands,
    },
    /// Manage the client configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print one setting
    Get { key: String },
    /// Store a setting; values are parsed as JSON, falling back to a string
    Set { key: String, value: String },
    /// Remove a setting
    Remove { key: String },
    /// Print every setting
    List,
}

#[derive(Subcommand)]
pub enum PushCommands {
    /// Show the subscription state
    Status,
    /// Subscribe using a push subscription exported by the browser
    Subscribe {
        /// JSON file with `endpoint` and `keys.p256dh` / `keys.auth`
        #[arg(long, value_name = "PATH")]
        subscription: PathBuf,
    },
    /// Cancel the subscription
    Unsubscribe,
    /// Reattach the saved subscription, clearing it if the handle is gone
    Resubscribe,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write or update the config file
    Init {
        /// Story API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// URL-safe base64 VAPID public key
        #[arg(long, value_name = "KEY")]
        vapid_public_key: Option<String>,
        /// HTTP request timeout
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
    },
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}
