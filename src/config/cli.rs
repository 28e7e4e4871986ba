use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use postboard_api_types::PostType;

use crate::application::filter::StatusFilter;

/// Command-line arguments for the postboard binary.
#[derive(Debug, Parser)]
#[command(
    name = "postboard",
    version,
    about = "Plan, draft and schedule LinkedIn posts from the terminal"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "POSTBOARD_CONFIG_FILE",
        value_name = "PATH",
        global = true,
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    /// File holding the bearer token.
    #[arg(
        long = "token-file",
        value_name = "PATH",
        global = true,
        value_hint = ValueHint::FilePath
    )]
    pub token_file: Option<PathBuf>,

    /// Bearer token; prefer --token-file to keep it out of shell history.
    #[arg(long, env = "POSTBOARD_TOKEN", hide_env_values = true, hide = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The command to run; the month calendar when none is given.
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Calendar(CalendarArgs::default()))
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the API base URL.
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the request timeout in seconds.
    #[arg(long = "api-timeout-seconds", value_name = "SECONDS", global = true)]
    pub api_timeout_seconds: Option<u64>,

    /// Override the viewer's IANA time zone, e.g. America/New_York.
    #[arg(long = "timezone", value_name = "TZ", global = true)]
    pub timezone: Option<String>,

    /// Override the first day of the week (sunday|monday).
    #[arg(long = "week-start", value_name = "DAY", global = true)]
    pub week_start: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show the month calendar.
    Calendar(CalendarArgs),
    /// List posts, filtered by status tab and search text.
    List(ListArgs),
    /// Create a post.
    Create(EditArgs),
    /// Edit an existing post.
    Edit(EditPostArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct CalendarArgs {
    /// Month to show as YYYY-MM; defaults to the current month.
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Only show posts whose title or content contains TEXT.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = StatusArg::All)]
    pub status: StatusArg,

    /// Case-insensitive text to match against title or content.
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct EditArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the post body from a file.
    #[arg(long = "content-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub content_file: Option<PathBuf>,

    #[arg(long = "type", value_enum)]
    pub kind: Option<PostTypeArg>,

    /// Whitespace-separated hashtags, e.g. "#launch #product".
    #[arg(long)]
    pub hashtags: Option<String>,

    /// Publish time in the viewer's zone, YYYY-MM-DDTHH:MM.
    #[arg(long, value_name = "LOCAL", conflicts_with_all = ["clear_schedule", "publish_now"])]
    pub schedule: Option<String>,

    /// Remove any publish time and save as a draft.
    #[arg(long = "clear-schedule", action = clap::ArgAction::SetTrue)]
    pub clear_schedule: bool,

    #[arg(
        long = "publish-now",
        action = clap::ArgAction::SetTrue,
        conflicts_with = "clear_schedule"
    )]
    pub publish_now: bool,

    /// Generate content and hashtags first; the topic defaults to the title.
    #[arg(long = "generate", value_name = "TOPIC", num_args = 0..=1, default_missing_value = "")]
    pub generate: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct EditPostArgs {
    /// Identifier of the post to edit.
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub edit: EditArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusArg {
    #[default]
    All,
    Draft,
    Scheduled,
    Published,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => StatusFilter::All,
            StatusArg::Draft => StatusFilter::Draft,
            StatusArg::Scheduled => StatusFilter::Scheduled,
            StatusArg::Published => StatusFilter::Published,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PostTypeArg {
    Text,
    Article,
    Carousel,
    Poll,
}

impl From<PostTypeArg> for PostType {
    fn from(value: PostTypeArg) -> Self {
        match value {
            PostTypeArg::Text => PostType::Text,
            PostTypeArg::Article => PostType::Article,
            PostTypeArg::Carousel => PostType::Carousel,
            PostTypeArg::Poll => PostType::Poll,
        }
    }
}
