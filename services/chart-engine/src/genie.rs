//!
//! src/genie.rs  Andrew Belles  Oct 5th, 2026
//!
//! Genie real-time top 200. Four pages keyed by the current date and
//! hour in Seoul, each scraped row by row
//!

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, FixedOffset, Utc};
use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

use crate::errors::ChartError;
use crate::fallback::FallbackChain;
use crate::fetch::{element_text, parse_document, Fetcher, Profile};
use crate::filter;
use crate::rank::{first_integer, MarkerKind, RankMovement};
use crate::types::{non_blank, normalize_art_url, ChartEntry};

pub const PAGES: u32 = 4;

/// Asia/Seoul, which has no daylight saving
const KST_OFFSET_SECS: i32 = 9 * 3600;

struct RowSelectors {
    row: Selector,
    number: Selector,
    title: Selector,
    artist: Selector,
    album: Selector,
    cover: Selector,
    marker: Selector
}

static SELECTORS: LazyLock<RowSelectors> = LazyLock::new(|| {
    let parse = |s: &str| Selector::parse(s).expect("genie selector must parse");
    RowSelectors {
        row: parse("table.list-wrap tbody tr.list"),
        number: parse("td.number"),
        title: parse("td.info a.title"),
        artist: parse("td.info a.artist"),
        album: parse("td.info a.albumtitle"),
        cover: parse("td a.cover img"),
        marker: parse(
            "td.number span.rank span.rank-up, td.number span.rank span.rank-down, \
             td.number span.rank span.rank-none, td.number span.rank span.rank-new, \
             td.number span.rank span.rank-re"
        )
    }
});

/// Chart date (yyyyMMdd) and hour (HH) as Genie keys them.
pub fn chart_window(now: DateTime<Utc>) -> (String, String) {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset in range");
    let local = now.with_timezone(&kst);
    (local.format("%Y%m%d").to_string(), local.format("%H").to_string())
}

pub fn page_url(base: &Url, ymd: &str, hh: &str, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("ditc", "D")
        .append_pair("rtm", "Y")
        .append_pair("ymd", ymd)
        .append_pair("hh", hh)
        .append_pair("pg", &page.to_string());
    url
}

/// A row plus how many rows were emitted before it, across pages.
struct GenieRow<'a> {
    el: ElementRef<'a>,
    emitted: usize
}

fn first_text(el: &ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel).next().map(element_text).unwrap_or_default()
}

fn rank_chain<'a>() -> FallbackChain<'a, GenieRow<'a>, u32> {
    FallbackChain::new("genie.rank")
        .or("number_cell", |r: &GenieRow<'a>| {
            first_integer(&first_text(&r.el, &SELECTORS.number))
        })
        .or("running_counter", |r: &GenieRow<'a>| Some(r.emitted as u32 + 1))
}

fn album_art_chain<'a>() -> FallbackChain<'a, GenieRow<'a>, String> {
    FallbackChain::new("genie.album_art")
        .or("cover_src", |r: &GenieRow<'a>| {
            r.el.select(&SELECTORS.cover).next()
                .and_then(|img| img.value().attr("src"))
                .and_then(normalize_art_url)
        })
        .or("cover_data_src", |r: &GenieRow<'a>| {
            r.el.select(&SELECTORS.cover).next()
                .and_then(|img| img.value().attr("data-src"))
                .and_then(normalize_art_url)
        })
}

fn movement(row: &ElementRef<'_>) -> RankMovement {
    let Some(marker) = row.select(&SELECTORS.marker).next() else {
        return RankMovement::STATIC;
    };
    match MarkerKind::from_classes(marker.value().classes()) {
        Some(kind) => RankMovement::from_marker(kind, &element_text(marker)),
        None => RankMovement::STATIC
    }
}

/// Parses one chart page. Rows whose artist does not contain `needle` are
/// dropped before they take a counter slot; `emitted_before` carries the
/// counter over from earlier pages.
pub fn parse_page(body: &str, needle: Option<&str>, emitted_before: usize) -> Vec<ChartEntry> {
    let doc = parse_document(body);
    let rank_of = rank_chain();
    let album_art = album_art_chain();

    let mut entries = Vec::new();
    for el in doc.select(&SELECTORS.row) {
        let artist = first_text(&el, &SELECTORS.artist);
        if let Some(needle) = needle {
            if !filter::matches(Some(artist.as_str()), needle) {
                continue;
            }
        }

        let Some(title) = non_blank(&first_text(&el, &SELECTORS.title)) else {
            debug!("genie.row.untitled");
            continue;
        };

        let row = GenieRow { el, emitted: emitted_before + entries.len() };
        let Some(rank) = rank_of.resolve(&row) else { continue };
        let moved = movement(&el);
        entries.push(ChartEntry {
            rank,
            artist_name: non_blank(&artist),
            title,
            album_name: first_text(&el, &SELECTORS.album),
            album_art: album_art.resolve(&row),
            song_id: el.value().attr("songid").and_then(non_blank),
            rank_status: moved.status,
            changed_rank: moved.changed
        });
    }
    entries
}

/// Uncached: every call scrapes all four pages again.
pub struct GenieChart {
    fetcher: Arc<Fetcher>,
    base: Url
}

impl GenieChart {
    pub fn new(fetcher: Arc<Fetcher>, base: Url) -> Self {
        Self { fetcher, base }
    }

    pub async fn top200(&self, artist: Option<&str>) -> Result<Vec<ChartEntry>, ChartError> {
        self.top200_at(Utc::now(), artist).await
    }

    pub async fn top200_at(&self, now: DateTime<Utc>, artist: Option<&str>) ->
        Result<Vec<ChartEntry>, ChartError> {

        let needle = filter::needle(artist);
        let (ymd, hh) = chart_window(now);

        let mut entries = Vec::new();
        for page in 1..=PAGES {
            let url = page_url(&self.base, &ymd, &hh, page);
            let body = self.fetcher.get_text(Profile::Genie, &url).await?;
            let rows = parse_page(&body, needle, entries.len());
            debug!(page, rows = rows.len(), %ymd, %hh, "genie.page");
            entries.extend(rows);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::types::RankStatus;

    fn row(songid: &str, number: &str, marker: &str, title: &str, artist: &str, art: &str) -> String {
        format!(r##"
            <tr class="list" songid="{songid}">
              <td class="check"><input type="checkbox"></td>
              <td class="number">{number}
                <span class="rank">{marker}</span>
              </td>
              <td><a href="#" class="cover"><img src="{art}" alt="cover"></a></td>
              <td class="info">
                <a href="#" class="title ellipsis">{title}</a>
                <a href="#" class="artist ellipsis">{artist}</a>
                <a href="#" class="albumtitle ellipsis">Album of {title}</a>
              </td>
            </tr>"##)
    }

    fn page(rows: &[String]) -> String {
        format!(
            r#"<html><body><table class="list-wrap"><tbody>{}</tbody></table></body></html>"#,
            rows.join("")
        )
    }

    #[test]
    fn rows_become_entries() {
        let html = page(&[
            row("111", "1", r#"<span class="rank-up">2<span class="hide">상승</span></span>"#,
                "Supernova", "aespa (에스파)", "//image.genie.co.kr/a.jpg"),
            row("222", "2", r#"<span class="rank-down">하강 4</span>"#,
                "Magnetic", "ILLIT", "https://image.genie.co.kr/b.jpg"),
            row("333", "3", r#"<span class="rank-new">new</span>"#,
                "How Sweet", "NewJeans", ""),
            row("444", "4", r#"<span class="rank-none">-</span>"#,
                "Hype Boy", "NewJeans", ""),
            row("555", "5", "", "Ditto", "NewJeans", ""),
        ]);
        let entries = parse_page(&html, None, 0);
        assert_eq!(entries.len(), 5);

        let first = &entries[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.song_id.as_deref(), Some("111"));
        assert_eq!(first.title, "Supernova");
        assert_eq!(first.artist_name.as_deref(), Some("aespa (에스파)"));
        assert_eq!(first.album_name, "Album of Supernova");
        assert_eq!(first.album_art.as_deref(), Some("https://image.genie.co.kr/a.jpg"));
        assert_eq!((first.rank_status, first.changed_rank), (RankStatus::Up, 2));

        assert_eq!((entries[1].rank_status, entries[1].changed_rank), (RankStatus::Down, 4));
        assert_eq!(entries[1].album_art.as_deref(), Some("https://image.genie.co.kr/b.jpg"));
        assert_eq!((entries[2].rank_status, entries[2].changed_rank), (RankStatus::New, 0));
        assert_eq!(entries[2].album_art, None);
        assert_eq!(entries[3].rank_status, RankStatus::Static);
        assert_eq!(entries[4].rank_status, RankStatus::Static);
    }

    #[test]
    fn reentry_counts_as_new() {
        let html = page(&[row("1", "9", r#"<span class="rank-re">re</span>"#, "Back", "X", "")]);
        let entries = parse_page(&html, None, 0);
        assert_eq!((entries[0].rank_status, entries[0].changed_rank), (RankStatus::New, 0));
    }

    #[test]
    fn rank_cell_beats_counter_and_counter_spans_pages() {
        let html = page(&[
            row("1", "51", "", "With number", "A", ""),
            row("2", "", "", "No number", "B", ""),
        ]);
        let entries = parse_page(&html, None, 50);
        assert_eq!(entries[0].rank, 51);
        // counter: 50 from earlier pages + 1 emitted here + 1
        assert_eq!(entries[1].rank, 52);
    }

    #[test]
    fn artist_filter_drops_rows_during_iteration() {
        let html = page(&[
            row("1", "1", "", "Supernova", "aespa", ""),
            row("2", "2", "", "Magnetic", "ILLIT", ""),
            row("3", "3", "", "Armageddon", "aespa", ""),
        ]);
        let entries = parse_page(&html, Some("aespa"), 0);
        let ranks: Vec<_> = entries.iter().map(|e| (e.rank, e.title.as_str())).collect();
        assert_eq!(ranks, vec![(1, "Supernova"), (3, "Armageddon")]);
    }

    #[test]
    fn missing_elements_are_empty_not_fatal() {
        let html = page(&[
            r#"<tr class="list" songid="9"><td class="info"><a class="title">Bare</a></td></tr>"#
                .to_string(),
            r#"<tr class="list"><td class="info"></td></tr>"#.to_string(),
        ]);
        let entries = parse_page(&html, None, 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].artist_name, None);
        assert_eq!(entries[0].album_name, "");
        assert_eq!(entries[0].album_art, None);
    }

    #[test]
    fn lazy_cover_falls_back_to_data_src() {
        let html = page(&[
            r#"<tr class="list"><td><a class="cover"><img data-src="//img/x.jpg"></a></td>
               <td class="info"><a class="title">Lazy</a></td></tr>"#.to_string()
        ]);
        let entries = parse_page(&html, None, 0);
        assert_eq!(entries[0].album_art.as_deref(), Some("https://img/x.jpg"));
    }

    #[tokio::test]
    async fn failed_page_fails_the_whole_chart() {
        use std::sync::atomic::Ordering;
        use crate::fetch::canned;

        let first = page(&[row("1", "1", "", "Supernova", "aespa", "")]);
        let (base, hits) = canned::serve(vec![
            canned::body("200 OK", &first),
            canned::status("404 Not Found"),
            canned::body("200 OK", &first),
        ]).await;
        let fetcher = Arc::new(Fetcher::new(&canned::http(2)).unwrap());
        let genie = GenieChart::new(fetcher, base);

        let now = Utc.with_ymd_and_hms(2026, 10, 19, 3, 0, 0).unwrap();
        let err = genie.top200_at(now, None).await.unwrap_err();
        assert!(matches!(err, ChartError::Status { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn window_uses_seoul_time() {
        // 2026-10-18 16:30 UTC is 2026-10-19 01:30 in Seoul
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 16, 30, 0).unwrap();
        assert_eq!(chart_window(now), ("20261019".to_string(), "01".to_string()));
    }

    #[test]
    fn page_urls_carry_window_and_page() {
        let base = Url::parse(crate::config::GENIE_CHART_URL).unwrap();
        let url = page_url(&base, "20261019", "01", 3);
        assert_eq!(
            url.as_str(),
            "https://www.genie.co.kr/chart/top200?ditc=D&rtm=Y&ymd=20261019&hh=01&pg=3"
        );
    }
}
