//! CLI argument definitions using clap derive macros.

use std::time::Duration;

use clap::Parser;

use metamaster_core::config::{DEFAULT_BACKLOG_TAG, DEFAULT_COOLDOWN_SECS, DEFAULT_FAILURE_THRESHOLD};
use metamaster_core::engine::{MAX_SIMILARITY, MIN_SIMILARITY};
use metamaster_core::http_client::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use metamaster_core::{ConfigError, ExtractorCredentials, RunConfig, Thresholds};

/// Enrich backlog catalog posts with tags, source and rating.
///
/// Metamaster picks posts carrying the backlog tag one at a time, reverse
/// searches their image, and writes back what the best match tells it.
#[derive(Parser)]
#[command(name = "metamaster")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print metadata for one post URL and exit
    #[arg(short = 'e', long, value_name = "URL")]
    pub extract: Option<String>,

    /// Backlog tag selecting posts to process
    #[arg(short = 't', long, default_value = DEFAULT_BACKLOG_TAG)]
    pub tag: String,

    /// Space-separated tags added to every processed post
    #[arg(short = 'a', long = "add", value_name = "TAGS", value_delimiter = ' ')]
    pub add: Vec<String>,

    /// Keep existing tags instead of replacing them with --add tags
    #[arg(long)]
    pub append: bool,

    /// Rehost the image before searching
    #[arg(short = 'u', long)]
    pub upload: bool,

    /// Recompress to WebP before rehosting
    #[arg(short = 'c', long, requires = "upload")]
    pub compress: bool,

    /// Replace sources that are already set
    #[arg(long)]
    pub override_source: bool,

    /// Tag posts nothing was found for with meta:unknown
    #[arg(long)]
    pub mark_unknown: bool,

    /// Pause between posts in seconds
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECS)]
    pub cooldown_secs: u64,

    /// Consecutive failed posts before giving up (1-100)
    #[arg(long, default_value_t = DEFAULT_FAILURE_THRESHOLD, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub failure_threshold: u32,

    /// Similarity a match must exceed to be trusted (0-100)
    #[arg(long, default_value_t = MAX_SIMILARITY)]
    pub max_similarity: f64,

    /// Similarity a match must exceed to be reported as a near miss (0-100)
    #[arg(long, default_value_t = MIN_SIMILARITY)]
    pub min_similarity: f64,

    /// HTTP connect timeout in seconds (1-300)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub connect_timeout_secs: u64,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout_secs: u64,

    /// Shimmie site root, e.g. https://booru.example
    #[arg(long, env = "SHIMMIE_ENDPOINT")]
    pub shimmie_endpoint: Option<String>,

    /// Shimmie login name
    #[arg(long, env = "SHIMMIE_LOGIN")]
    pub shimmie_login: Option<String>,

    /// Shimmie password
    #[arg(long, env = "SHIMMIE_PASSWORD", hide_env_values = true)]
    pub shimmie_password: Option<String>,

    /// SauceNAO API key
    #[arg(long, env = "SAUCENAO_API_KEY", hide_env_values = true)]
    pub saucenao_api_key: Option<String>,

    /// Chibisafe upload endpoint
    #[arg(long, env = "CHIBISAFE_UPLOAD_URL")]
    pub chibisafe_upload_url: Option<String>,

    /// Chibisafe API key
    #[arg(long, env = "CHIBISAFE_API_KEY", hide_env_values = true)]
    pub chibisafe_api_key: Option<String>,

    /// Danbooru login name
    #[arg(long, env = "DANBOORU_LOGIN")]
    pub danbooru_login: Option<String>,

    /// Danbooru API key
    #[arg(long, env = "DANBOORU_KEY", hide_env_values = true)]
    pub danbooru_key: Option<String>,

    /// Gelbooru user id
    #[arg(long, env = "GELBOORU_ID")]
    pub gelbooru_id: Option<String>,

    /// Gelbooru API key
    #[arg(long, env = "GELBOORU_KEY", hide_env_values = true)]
    pub gelbooru_key: Option<String>,
}

impl Args {
    /// Builds and validates the worker configuration.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let config = RunConfig {
            backlog_tag: self.tag.trim().to_string(),
            extra_tags: self
                .add
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            append_existing_tags: self.append,
            upload: self.upload,
            compress: self.compress,
            override_source: self.override_source,
            mark_unknown: self.mark_unknown,
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
            thresholds: Thresholds {
                max_similarity: self.max_similarity,
                min_similarity: self.min_similarity,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Optional per-site API credentials.
    pub fn extractor_credentials(&self) -> ExtractorCredentials {
        ExtractorCredentials {
            danbooru_login: self.danbooru_login.clone(),
            danbooru_api_key: self.danbooru_key.clone(),
            gelbooru_user_id: self.gelbooru_id.clone(),
            gelbooru_api_key: self.gelbooru_key.clone(),
        }
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("extract", &self.extract)
            .field("tag", &self.tag)
            .field("add", &self.add)
            .field("append", &self.append)
            .field("upload", &self.upload)
            .field("compress", &self.compress)
            .field("override_source", &self.override_source)
            .field("mark_unknown", &self.mark_unknown)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("failure_threshold", &self.failure_threshold)
            .field("shimmie_endpoint", &self.shimmie_endpoint)
            .field("shimmie_login", &self.shimmie_login)
            .finish_non_exhaustive()
    }
}
