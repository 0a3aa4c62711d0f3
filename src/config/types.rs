use serde::Deserialize;

/// Main configuration structure for Note-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// How far a walk goes through an owner's listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlMode {
    /// Process exactly one listing page per owner
    FirstPage,
    /// Walk until the listing ends or staleness halts the walk
    Exhaustive,
}

impl CrawlMode {
    /// Parses a CLI spelling (`first-page` / `exhaustive`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first-page" | "first_page" | "first" => Some(Self::FirstPage),
            "exhaustive" | "all" => Some(Self::Exhaustive),
            _ => None,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Stop policy for each owner's walk
    #[serde(default = "default_mode")]
    pub mode: CrawlMode,

    /// Cutoff expression (`all`, `1day`, `3day`, `1week`, `1month`, `7d`, `2w`, `YYYY-MM-DD`)
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Merge into the existing store and skip already captured notes
    #[serde(default = "default_true")]
    pub update: bool,

    /// Consecutive stale notes tolerated before a walk halts
    #[serde(rename = "stale-tolerance", default = "default_stale_tolerance")]
    pub stale_tolerance: u32,

    /// Optional cap on kept notes per owner
    #[serde(rename = "max-items", default)]
    pub max_items: Option<usize>,

    /// Pause between successive note detail requests (seconds)
    #[serde(rename = "item-delay-secs", default = "default_item_delay")]
    pub item_delay_secs: u64,

    /// Total attempts for throttled listing calls and empty payloads
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between those attempts (seconds)
    #[serde(rename = "retry-backoff-secs", default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// Notes requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            interval: default_interval(),
            update: true,
            stale_tolerance: default_stale_tolerance(),
            max_items: None,
            item_delay_secs: default_item_delay(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff(),
            page_size: default_page_size(),
        }
    }
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the JSON API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the public web front-end (note and profile links)
    #[serde(rename = "web-url", default = "default_web_url")]
    pub web_url: String,

    /// Prefix joined with a note's origin key to form its video address
    #[serde(rename = "video-cdn", default = "default_video_cdn")]
    pub video_cdn: String,

    /// Environment variable holding the session cookie string
    #[serde(rename = "cookies-env", default = "default_cookies_env")]
    pub cookies_env: String,

    /// External signing program and its leading arguments
    #[serde(rename = "signer-command", default)]
    pub signer_command: Vec<String>,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Optional HTTP(S) proxy
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            web_url: default_web_url(),
            video_cdn: default_video_cdn(),
            cookies_env: default_cookies_env(),
            signer_command: Vec::new(),
            user_agent: default_user_agent(),
            proxy: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Owner list input
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Text file with one owner profile URL (or bare id) per line
    #[serde(rename = "owners-file")]
    pub owners_file: String,
}

/// Which media files are downloaded next to each note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaPolicy {
    All,
    Images,
    Videos,
    None,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Root directory of the per-owner note folders
    #[serde(rename = "media-root")]
    pub media_root: String,

    /// Media download policy
    #[serde(default = "default_media_policy")]
    pub media: MediaPolicy,
}

/// On-image text extraction
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub enabled: bool,

    /// OCR program; image bytes go to stdin, text is read from stdout
    #[serde(default = "default_ocr_command")]
    pub command: String,

    #[serde(default = "default_ocr_args")]
    pub args: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_ocr_command(),
            args: default_ocr_args(),
        }
    }
}

/// Digest output
#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Directory receiving `<label>_content.txt` and `<label>_summary.txt`
    #[serde(rename = "output-dir", default = "default_digest_dir")]
    pub output_dir: String,

    /// Text file with one recipient id per line
    #[serde(rename = "recipients-file", default)]
    pub recipients_file: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_digest_dir(),
            recipients_file: None,
        }
    }
}

/// OpenAI-compatible summarization endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(rename = "base-url", default = "default_summarizer_url")]
    pub base_url: String,

    #[serde(default = "default_summarizer_model")]
    pub model: String,

    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(rename = "system-prompt", default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: default_summarizer_url(),
            model: default_summarizer_model(),
            api_key_env: default_api_key_env(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Push notification endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_notifier_endpoint")]
    pub endpoint: String,

    #[serde(rename = "app-token-env", default = "default_app_token_env")]
    pub app_token_env: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_notifier_endpoint(),
            app_token_env: default_app_token_env(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mode() -> CrawlMode {
    CrawlMode::Exhaustive
}

fn default_interval() -> String {
    "all".to_string()
}

fn default_stale_tolerance() -> u32 {
    3
}

fn default_item_delay() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    180
}

fn default_page_size() -> u32 {
    30
}

fn default_base_url() -> String {
    "https://edith.xiaohongshu.com".to_string()
}

fn default_web_url() -> String {
    "https://www.xiaohongshu.com".to_string()
}

fn default_video_cdn() -> String {
    "https://sns-video-bd.xhscdn.com/".to_string()
}

fn default_cookies_env() -> String {
    "COOKIES".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_media_policy() -> MediaPolicy {
    MediaPolicy::All
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_args() -> Vec<String> {
    ["stdin", "stdout", "-l", "chi_sim+eng"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_digest_dir() -> String {
    "datas/day_summary_datas".to_string()
}

fn default_summarizer_url() -> String {
    "https://ark.cn-beijing.volces.com/api/v3".to_string()
}

fn default_summarizer_model() -> String {
    "doubao-seed-1-8-251228".to_string()
}

fn default_api_key_env() -> String {
    "ARK_API_KEY".to_string()
}

fn default_system_prompt() -> String {
    "You are an analyst. Summarize the following notes, including the text recognized on their images, into a concise daily briefing.".to_string()
}

fn default_notifier_endpoint() -> String {
    "https://wxpusher.zjiecode.com/api/send/message".to_string()
}

fn default_app_token_env() -> String {
    "WXPUSHER_APP_TOKEN".to_string()
}
