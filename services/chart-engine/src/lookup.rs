//!
//! src/lookup.rs  Andrew Belles  Oct 8th, 2026
//!
//! Album and song lookups on Melon and Genie. Plain scrapes with no
//! caching and no rank handling
//!

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::Selector;
use tracing::debug;
use url::Url;

use crate::errors::ChartError;
use crate::fetch::{element_text, parse_document, Fetcher, Profile};
use crate::types::DetailEntry;

struct Patterns {
    album_links: Selector,
    melon_songs: Selector,
    genie_songs: Selector,
    genie_song_title: Selector,
    melon_album_id: Regex,
    melon_song_id: Regex,
    genie_album_id: Regex
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let sel = |s: &str| Selector::parse(s).expect("lookup selector must parse");
    let re = |s: &str| Regex::new(s).expect("lookup regex must compile");
    Patterns {
        album_links: sel("dt > a"),
        melon_songs: sel(".wrap_song_info .ellipsis > span > a"),
        genie_songs: sel("tbody > .list"),
        genie_song_title: sel(".title"),
        melon_album_id: re(r"goAlbumDetail\('(.*?)'\)"),
        melon_song_id: re(r",(.*?)\)"),
        genie_album_id: re(r"fnViewAlbumLayer\('(.*?)'\)")
    }
});

/// Every capture of `re` in `attr`, each paired with the link text.
fn captures(title: &str, attr: &str, re: &Regex) -> Vec<DetailEntry> {
    re.captures_iter(attr)
        .filter_map(|c| c.get(1))
        .map(|m| DetailEntry { title: title.to_string(), number: m.as_str().to_string() })
        .collect()
}

fn linked_details(body: &str, links: &Selector, attr: &str, re: &Regex) -> Vec<DetailEntry> {
    let doc = parse_document(body);
    doc.select(links)
        .flat_map(|a| {
            let title = element_text(a);
            captures(&title, a.value().attr(attr).unwrap_or_default(), re)
        })
        .collect()
}

pub fn parse_melon_albums(body: &str) -> Vec<DetailEntry> {
    let p = &*PATTERNS;
    linked_details(body, &p.album_links, "href", &p.melon_album_id)
}

pub fn parse_melon_songs(body: &str) -> Vec<DetailEntry> {
    let p = &*PATTERNS;
    linked_details(body, &p.melon_songs, "href", &p.melon_song_id)
}

pub fn parse_genie_albums(body: &str) -> Vec<DetailEntry> {
    let p = &*PATTERNS;
    linked_details(body, &p.album_links, "onclick", &p.genie_album_id)
}

pub fn parse_genie_songs(body: &str) -> Vec<DetailEntry> {
    let doc = parse_document(body);
    doc.select(&PATTERNS.genie_songs)
        .map(|row| DetailEntry {
            title: row.select(&PATTERNS.genie_song_title)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" "),
            number: row.value().attr("songid").unwrap_or_default().to_string()
        })
        .collect()
}

pub struct Lookups {
    fetcher: Arc<Fetcher>,
    melon_base: Url,
    genie_base: Url
}

impl Lookups {
    pub fn new(fetcher: Arc<Fetcher>, melon_base: Url, genie_base: Url) -> Self {
        Self { fetcher, melon_base, genie_base }
    }

    fn url(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, ChartError> {
        let mut url = base.join(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// GET /search/album/index.htm?q=...
    pub fn melon_albums_url(&self, artist: &str) -> Result<Url, ChartError> {
        Self::url(&self.melon_base, "search/album/index.htm", &[
            ("q", artist),
            ("section", ""),
            ("searchGnbYn", "Y"),
            ("kkoSpl", "Y"),
            ("kkoDpType", ""),
            ("linkOrText", "T"),
            ("ipath", "srch_form")
        ])
    }

    /// GET /album/detail.htm?albumId=...
    pub fn melon_songs_url(&self, album_id: &str) -> Result<Url, ChartError> {
        Self::url(&self.melon_base, "album/detail.htm", &[("albumId", album_id)])
    }

    /// GET /search/searchAlbum?query=...
    pub fn genie_albums_url(&self, artist: &str) -> Result<Url, ChartError> {
        Self::url(&self.genie_base, "search/searchAlbum", &[("query", artist)])
    }

    /// GET /detail/albumInfo?axnm=...
    pub fn genie_songs_url(&self, album_id: &str) -> Result<Url, ChartError> {
        Self::url(&self.genie_base, "detail/albumInfo", &[("axnm", album_id)])
    }

    async fn scrape(&self, url: Url, parse: fn(&str) -> Vec<DetailEntry>) ->
        Result<Vec<DetailEntry>, ChartError> {
        let body = self.fetcher.get_text(Profile::Lookup, &url).await?;
        let found = parse(&body);
        debug!(%url, found = found.len(), "lookup.done");
        Ok(found)
    }

    pub async fn melon_albums(&self, artist: &str) -> Result<Vec<DetailEntry>, ChartError> {
        self.scrape(self.melon_albums_url(artist)?, parse_melon_albums).await
    }

    pub async fn melon_songs(&self, album_id: &str) -> Result<Vec<DetailEntry>, ChartError> {
        self.scrape(self.melon_songs_url(album_id)?, parse_melon_songs).await
    }

    pub async fn genie_albums(&self, artist: &str) -> Result<Vec<DetailEntry>, ChartError> {
        self.scrape(self.genie_albums_url(artist)?, parse_genie_albums).await
    }

    pub async fn genie_songs(&self, album_id: &str) -> Result<Vec<DetailEntry>, ChartError> {
        self.scrape(self.genie_songs_url(album_id)?, parse_genie_songs).await
    }
}
