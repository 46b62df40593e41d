//!
//! src/config.rs  Andrew Belles  Oct 2nd, 2026
//!
//! Loads the engine configuration from the environment (and .env),
//! falling back to the defaults below
//!

use url::Url;
use std::time;
use crate::errors::ChartError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 8;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;
pub const RETRY_JITTER: bool = true;
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constants for chart sources
pub const FLO_CHART_URL: &str =
    "https://www.music-flo.com/api/display/v1/browser/chart/1/track/list?size=100";
pub const GENIE_CHART_URL: &str = "https://www.genie.co.kr/chart/top200";
pub const GENIE_BASE_URL: &str = "https://www.genie.co.kr/";
pub const MELON_CHART_URL: &str = "https://www.melon.com/chart/index.htm";
pub const MELON_HOT100_URL: &str = "https://www.melon.com/chart/hot100/index.htm";
pub const MELON_BASE_URL: &str = "https://www.melon.com/";

pub const CHART_REFRESH_SECS: u64 = 3600;

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn env_to_u64(s: &str, default: u64) -> u64 {
    match std::env::var(s) {
        Ok(v) => v.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default
    }
}

/// Parses a source url and checks it still points at the expected site.
pub fn parse_source_url(name: &str, raw: &str, expected_host: &str) ->
    Result<Url, ChartError> {

    let url = Url::parse(raw)
        .map_err(|e| ChartError::Config(format!("{name} invalid {e}")))?;

    ensure_https(&url).map_err(ChartError::Config)?;
    ensure_host(&url, expected_host).map_err(ChartError::Config)?;
    Ok(url)
}

fn source_url(name: &str, default: &str, expected_host: &str) ->
    Result<Url, ChartError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    parse_source_url(name, &raw, expected_host)
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            jitter: RETRY_JITTER,
            retryable_statuses: RETRYABLE_STATUSES.to_vec()
        }
    }
}

impl RetryConfig {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

fn build_http() -> HttpConfig {
    let mut http = HttpConfig::default();
    http.timeout = time::Duration::from_millis(
        env_to_u64("HTTP_TIMEOUT_MS", HTTP_TIMEOUT)
    );
    http.connect_timeout = time::Duration::from_millis(
        env_to_u64("HTTP_CONNECT_TIMEOUT_MS", HTTP_CONNECT_TIMEOUT)
    );
    // attempts = retries + the first request
    let retries = env_to_u64("HTTP_MAX_RETRIES", (RETRY_MAX_ATTEMPTS - 1) as u64);
    http.retry.max_attempts = retries.min(9) as u8 + 1;
    http
}

///
/// Endpoints of the three chart sites and the lookup pages
///
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub flo_chart: Url,
    pub genie_chart: Url,
    pub genie_base: Url,
    pub melon_chart: Url,
    pub melon_hot100: Url,
    pub melon_base: Url
}

impl Default for SourcesConfig {
    fn default() -> Self {
        // compiled-in constants, always valid
        let parse = |s: &str| Url::parse(s).expect("default source url");
        Self {
            flo_chart: parse(FLO_CHART_URL),
            genie_chart: parse(GENIE_CHART_URL),
            genie_base: parse(GENIE_BASE_URL),
            melon_chart: parse(MELON_CHART_URL),
            melon_hot100: parse(MELON_HOT100_URL),
            melon_base: parse(MELON_BASE_URL)
        }
    }
}

fn build_sources() -> Result<SourcesConfig, ChartError> {
    Ok( SourcesConfig {
        flo_chart: source_url("FLO_CHART_URL", FLO_CHART_URL, "www.music-flo.com")?,
        genie_chart: source_url("GENIE_CHART_URL", GENIE_CHART_URL, "www.genie.co.kr")?,
        genie_base: source_url("GENIE_BASE_URL", GENIE_BASE_URL, "www.genie.co.kr")?,
        melon_chart: source_url("MELON_CHART_URL", MELON_CHART_URL, "www.melon.com")?,
        melon_hot100: source_url("MELON_HOT100_URL", MELON_HOT100_URL, "www.melon.com")?,
        melon_base: source_url("MELON_BASE_URL", MELON_BASE_URL, "www.melon.com")?
    })
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub refresh_interval: time::Duration
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { refresh_interval: time::Duration::from_secs(CHART_REFRESH_SECS) }
    }
}

fn build_cache() -> Result<CacheConfig, ChartError> {
    let secs = env_to_u64("CHART_REFRESH_SECS", CHART_REFRESH_SECS);
    if secs == 0 {
        return Err(ChartError::Config("CHART_REFRESH_SECS must be > 0".to_string()));
    }
    Ok( CacheConfig { refresh_interval: time::Duration::from_secs(secs) } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,chart_engine=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(format) = std::env::var("LOG_FORMAT").ok().as_deref()
        .and_then(LogFormat::parse) {
        logging.format = format;
    }
    logging
}

///
/// AppConfig which holds everything the engine and its clients need
///
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ChartError> {
    dotenvy::dotenv().ok();

    let http    = build_http();
    let sources = build_sources()?;
    let cache   = build_cache()?;
    let logging = build_logging();

    Ok( AppConfig { http, sources, cache, logging } )
}
