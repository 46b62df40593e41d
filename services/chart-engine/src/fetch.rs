//!
//! src/fetch.rs  Andrew Belles  Oct 3rd, 2026
//!
//! Defines methods for hitting the chart sites and returning
//! unparsed bodies, handling retries, timeouts, etc.
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::{Client, header, redirect};
use scraper::{ElementRef, Html};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::config::{HttpConfig, RetryConfig};
use crate::errors::ChartError;

/// Header values the sites expect; other agents get blocked or served
/// different markup.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const HTML_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

pub const FLO_USER_AGENT: &str = "Mozilla/5.0";
pub const FLO_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en;q=0.8";

pub const GENIE_REFERER: &str = "https://www.genie.co.kr/";
pub const MELON_REFERER: &str = "https://www.melon.com/";
pub const LOOKUP_USER_AGENT: &str = "Chrome";

/// Which site a request is for; decides the default headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Flo,
    Genie,
    Melon,
    Lookup
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Flo    => "flo",
            Profile::Genie  => "genie",
            Profile::Melon  => "melon",
            Profile::Lookup => "lookup"
        }
    }

    fn headers(self) -> header::HeaderMap {
        use header::HeaderValue;

        let mut h = header::HeaderMap::new();
        match self {
            Profile::Flo => {
                h.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
                h.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(FLO_ACCEPT_LANGUAGE));
            }
            Profile::Genie => {
                h.insert(header::ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
                h.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(HTML_ACCEPT_LANGUAGE));
                h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                h.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                h.insert(header::REFERER, HeaderValue::from_static(GENIE_REFERER));
            }
            Profile::Melon => {
                h.insert(header::ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
                h.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(HTML_ACCEPT_LANGUAGE));
                h.insert(header::REFERER, HeaderValue::from_static(MELON_REFERER));
            }
            Profile::Lookup => {}
        }
        h
    }

    fn user_agent(self) -> &'static str {
        match self {
            Profile::Flo => FLO_USER_AGENT,
            Profile::Genie | Profile::Melon => BROWSER_USER_AGENT,
            Profile::Lookup => LOOKUP_USER_AGENT
        }
    }
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_for(http: &HttpConfig, profile: Profile) -> Result<Client, ChartError> {
    client_helper(http)
        .default_headers(profile.headers())
        .user_agent(profile.user_agent())
        .build()
        .map_err(|e| ChartError::Http(format!("build {} client: {e}", profile.as_str())))
}

/// Simple function to generate random wait between attempts
fn generate_backoff(base: Duration, attempt: u32, jitter: bool, rng: &mut SmallRng) ->
    Duration {
    let exp = base * (1_u32 << attempt.min(6));
    if jitter {
        exp + Duration::from_millis(rng.gen_range(50..=200))
    } else {
        exp
    }
}

/// Stateless GET primitive shared by every adapter. One pooled client per
/// profile, no caching.
#[derive(Debug, Clone)]
pub struct Fetcher {
    flo: Client,
    genie: Client,
    melon: Client,
    lookup: Client,
    retry: RetryConfig
}

impl Fetcher {
    pub fn new(http: &HttpConfig) -> Result<Self, ChartError> {
        Ok( Self {
            flo: client_for(http, Profile::Flo)?,
            genie: client_for(http, Profile::Genie)?,
            melon: client_for(http, Profile::Melon)?,
            lookup: client_for(http, Profile::Lookup)?,
            retry: http.retry.clone()
        })
    }

    fn client(&self, profile: Profile) -> &Client {
        match profile {
            Profile::Flo    => &self.flo,
            Profile::Genie  => &self.genie,
            Profile::Melon  => &self.melon,
            Profile::Lookup => &self.lookup
        }
    }

    /// GET with retries on transient failures; non-2xx surfaces as `Status`.
    async fn send_with_retry(&self, profile: Profile, url: &Url) ->
        Result<reqwest::Response, ChartError> {

        let mut rng = SmallRng::from_entropy();
        let max_attempts = u32::from(self.retry.max_attempts.max(1));
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let outcome = match self.client(profile).get(url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let err = ChartError::Status { url: url.to_string(), status };
                    (err, self.retry.is_retryable(status))
                }
                Err(e) => {
                    let err = ChartError::from(e);
                    let retryable = err.is_transient();
                    (err, retryable)
                }
            };

            let (err, retryable) = outcome;
            if !retryable || attempt >= max_attempts {
                return Err(err);
            }
            let backoff = generate_backoff(
                self.retry.base_backoff, attempt - 1, self.retry.jitter, &mut rng
            );
            warn!(
                source = profile.as_str(), %url, error = %err, attempt,
                backoff_ms = backoff.as_millis() as u64, "http.retry"
            );
            sleep(backoff).await;
        }
    }

    pub async fn get_bytes(&self, profile: Profile, url: &Url) ->
        Result<Vec<u8>, ChartError> {
        let resp = self.send_with_retry(profile, url).await?;
        let body = resp.bytes().await?;
        debug!(source = profile.as_str(), %url, bytes = body.len(), "http.fetched");
        Ok(body.to_vec())
    }

    pub async fn get_text(&self, profile: Profile, url: &Url) ->
        Result<String, ChartError> {
        let resp = self.send_with_retry(profile, url).await?;
        let body = resp.text().await?;
        debug!(source = profile.as_str(), %url, bytes = body.len(), "http.fetched");
        Ok(body)
    }
}

/// Html trees are not Send; parse after the body is in hand and drop the
/// tree before the next await.
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

/// Text content with whitespace runs collapsed and the ends trimmed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
