//!
//! src/melon.rs  Andrew Belles  Oct 6th, 2026
//!
//! Melon top 100 and hot 100 pages. Both variants share the same row
//! markup; only the url differs
//!

use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

use crate::errors::ChartError;
use crate::fallback::FallbackChain;
use crate::fetch::{element_text, parse_document, Fetcher, Profile};
use crate::filter;
use crate::rank::RankMovement;
use crate::types::{non_blank, normalize_art_url, ChartEntry};

struct RowSelectors {
    row: Selector,
    title: Selector,
    artist_links: Selector,
    artist_span: Selector,
    album: Selector,
    art: Selector
}

static SELECTORS: LazyLock<RowSelectors> = LazyLock::new(|| {
    let parse = |s: &str| Selector::parse(s).expect("melon selector must parse");
    RowSelectors {
        row: parse("tr[data-song-no]"),
        title: parse(".rank01 a"),
        artist_links: parse(".rank02 a"),
        artist_span: parse(".rank02 span"),
        album: parse(".rank03 a"),
        art: parse("a.image_typeAll img")
    }
});

/// Release window of the hot 100 chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hot100Window {
    /// released within 100 days
    D100,
    /// released within 30 days
    D30
}

impl Hot100Window {
    /// Unknown tokens fall back to D100.
    pub fn from_token(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("D30") {
            Hot100Window::D30
        } else {
            Hot100Window::D100
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Hot100Window::D100 => "D100",
            Hot100Window::D30  => "D30"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MelonMode {
    Top100,
    Hot100(Hot100Window)
}

fn first_text(el: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel).next().map(element_text)
}

fn artist_chain<'a>() -> FallbackChain<'a, ElementRef<'a>, String> {
    FallbackChain::new("melon.artist")
        .or("linked_names", |row: &ElementRef<'a>| {
            // the cell repeats its links in a hidden span.checkEllipsis copy
            let mut names: Vec<String> = Vec::new();
            for name in row.select(&SELECTORS.artist_links)
                .filter_map(|a| non_blank(&element_text(a))) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            (!names.is_empty()).then(|| names.join(", "))
        })
        .or("span_text", |row: &ElementRef<'a>| {
            first_text(row, &SELECTORS.artist_span).and_then(|s| non_blank(&s))
        })
}

/// Rank is the row's position among all `tr[data-song-no]` rows, counted
/// before the title check and before filtering, so it is the true chart
/// position even when `needle` drops rows.
pub fn parse_chart(body: &str, needle: Option<&str>) -> Vec<ChartEntry> {
    let doc = parse_document(body);
    let artist = artist_chain();

    let mut entries = Vec::new();
    let mut position = 0_u32;
    for row in doc.select(&SELECTORS.row) {
        position += 1;

        let Some(title) = first_text(&row, &SELECTORS.title).and_then(|t| non_blank(&t)) else {
            debug!(position, "melon.row.untitled");
            continue;
        };

        let artist_name = artist.resolve(&row);
        if let Some(needle) = needle {
            if !filter::matches(artist_name.as_deref(), needle) {
                continue;
            }
        }

        let moved = RankMovement::STATIC;
        entries.push(ChartEntry {
            rank: position,
            artist_name,
            title,
            album_name: first_text(&row, &SELECTORS.album).unwrap_or_default(),
            album_art: row.select(&SELECTORS.art).next()
                .and_then(|img| img.value().attr("src"))
                .and_then(normalize_art_url),
            song_id: row.value().attr("data-song-no").and_then(non_blank),
            rank_status: moved.status,
            changed_rank: moved.changed
        });
    }
    entries
}

/// Uncached: every call fetches the page again.
pub struct MelonChart {
    fetcher: Arc<Fetcher>,
    chart_url: Url,
    hot100_url: Url
}

impl MelonChart {
    pub fn new(fetcher: Arc<Fetcher>, chart_url: Url, hot100_url: Url) -> Self {
        Self { fetcher, chart_url, hot100_url }
    }

    pub fn url_for(&self, mode: MelonMode) -> Url {
        match mode {
            MelonMode::Top100 => self.chart_url.clone(),
            MelonMode::Hot100(window) => {
                let mut url = self.hot100_url.clone();
                url.query_pairs_mut()
                    .clear()
                    .append_pair("chartType", window.as_str());
                url
            }
        }
    }

    pub async fn chart(&self, mode: MelonMode, artist: Option<&str>) ->
        Result<Vec<ChartEntry>, ChartError> {

        let url = self.url_for(mode);
        let body = self.fetcher.get_text(Profile::Melon, &url).await?;
        let entries = parse_chart(&body, filter::needle(artist));
        debug!(?mode, entries = entries.len(), "melon.chart.parsed");
        Ok(entries)
    }

    pub async fn top100(&self, artist: Option<&str>) -> Result<Vec<ChartEntry>, ChartError> {
        self.chart(MelonMode::Top100, artist).await
    }

    pub async fn hot100(&self, token: &str, artist: Option<&str>) ->
        Result<Vec<ChartEntry>, ChartError> {
        self.chart(MelonMode::Hot100(Hot100Window::from_token(token)), artist).await
    }
}
