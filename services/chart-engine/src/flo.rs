//!
//! src/flo.rs  Andrew Belles  Oct 4th, 2026
//!
//! FLO chart client. One fixed top 100 JSON payload, deserialized
//! leniently and mapped into chart entries
//!

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::cache::ChartSource;
use crate::errors::ChartError;
use crate::fallback::FallbackChain;
use crate::fetch::{Fetcher, Profile};
use crate::rank::RankMovement;
use crate::types::{non_blank, ChartEntry};

pub const ART_SIZE: i64 = 350;

///
/// Wire shape of the track list endpoint. Every field is optional and read
/// leniently: a value of the wrong type becomes None, and a malformed
/// track drops only itself.
///

#[derive(Debug, Default, Deserialize)]
struct FloRoot {
    #[serde(default, deserialize_with = "lenient")]
    data: Option<FloData>
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloData {
    #[serde(default, deserialize_with = "lenient_list")]
    track_list: Option<Vec<Option<FloTrack>>>
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloTrack {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    album: Option<FloAlbum>,
    #[serde(default, deserialize_with = "lenient")]
    representation_artist: Option<FloArtist>,
    #[serde(default, deserialize_with = "lenient_list")]
    artist_list: Option<Vec<Option<FloArtist>>>,
    #[serde(default, deserialize_with = "lenient")]
    rank: Option<FloRank>
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloAlbum {
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    img: Option<FloImg>,
    #[serde(default, deserialize_with = "lenient_list")]
    img_list: Option<Vec<Option<FloImage>>>
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloImg {
    #[serde(default, deserialize_with = "lenient_string")]
    url_format: Option<String>
}

#[derive(Debug, Default, Deserialize)]
struct FloImage {
    #[serde(default, deserialize_with = "lenient_int")]
    size: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    url: Option<String>
}

#[derive(Debug, Default, Deserialize)]
struct FloArtist {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloRank {
    #[serde(default, deserialize_with = "lenient_flag")]
    new_yn: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    rank_badge: Option<i64>
}

/// Nested object that may be missing, null or of another type entirely.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned
{
    Ok(Option::<Value>::deserialize(d)?.and_then(|v| serde_json::from_value(v).ok()))
}

/// Arrays keep their length so positions survive; unreadable elements are None.
fn lenient_list<'de, D, T>(d: D) -> Result<Option<Vec<Option<T>>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(
            items.into_iter().map(|v| serde_json::from_value(v).ok()).collect()
        ),
        _ => None
    })
}

/// Scalars are coerced to their text form, anything else is absent.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None
    })
}

/// Numbers sometimes arrive quoted; anything unreadable is treated as absent.
fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None
    })
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => non_blank(&s),
        _ => None
    })
}

///
/// Field resolution chains
///

fn artist_chain() -> FallbackChain<'static, FloTrack, String> {
    FallbackChain::new("flo.artist")
        .or("representation_artist", |t: &FloTrack| {
            t.representation_artist.as_ref()
                .and_then(|a| a.name.as_deref())
                .and_then(non_blank)
        })
        .or("artist_list", |t: &FloTrack| {
            let names: Vec<String> = t.artist_list.iter()
                .flatten()
                .flatten()
                .filter_map(|a| a.name.as_deref().and_then(non_blank))
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        })
}

fn album_art_chain() -> FallbackChain<'static, FloTrack, String> {
    FallbackChain::new("flo.album_art")
        .or("url_format", |t: &FloTrack| {
            t.album.as_ref()
                .and_then(|a| a.img.as_ref())
                .and_then(|i| i.url_format.as_deref())
                .and_then(non_blank)
                .map(|f| f.replace("{size}", &ART_SIZE.to_string()))
        })
        .or("img_list", |t: &FloTrack| {
            t.album.as_ref()
                .and_then(|a| a.img_list.as_ref())
                .into_iter()
                .flatten()
                .flatten()
                .find(|img| img.size == Some(ART_SIZE) && img.url.is_some())
                .and_then(|img| img.url.as_deref())
                .and_then(non_blank)
        })
}

fn movement(track: &FloTrack) -> RankMovement {
    match &track.rank {
        Some(rank) => RankMovement::from_flags(rank.new_yn.as_deref(), rank.rank_badge),
        None => RankMovement::STATIC
    }
}

/// Maps a raw payload into entries. Rank is the 1-based position in the
/// track list; tracks without a title are skipped but keep their slot.
/// Only a body that is not JSON at all is an error; a missing or
/// misshapen track list is an empty chart.
pub fn parse_chart(body: &[u8]) -> Result<Vec<ChartEntry>, ChartError> {
    let raw: Value = serde_json::from_slice(body)?;
    let root: FloRoot = serde_json::from_value(raw).unwrap_or_default();
    let Some(tracks) = root.data.and_then(|d| d.track_list) else {
        debug!("flo.chart.empty");
        return Ok(Vec::new());
    };

    let artist = artist_chain();
    let album_art = album_art_chain();

    let mut entries = Vec::with_capacity(tracks.len());
    for (idx, track) in tracks.iter().enumerate() {
        let Some(track) = track else { continue };
        let Some(title) = track.name.as_deref().and_then(non_blank) else {
            debug!(position = idx + 1, "flo.track.untitled");
            continue;
        };

        let moved = movement(track);
        entries.push(ChartEntry {
            rank: (idx + 1) as u32,
            artist_name: artist.resolve(track),
            title,
            album_name: track.album.as_ref()
                .and_then(|a| a.title.clone())
                .unwrap_or_default(),
            album_art: album_art.resolve(track),
            song_id: track.id.clone(),
            rank_status: moved.status,
            changed_rank: moved.changed
        });
    }
    Ok(entries)
}

/// The cached source: fetches the FLO top 100 on demand.
pub struct FloChart {
    fetcher: Arc<Fetcher>,
    url: Url
}

impl FloChart {
    pub fn new(fetcher: Arc<Fetcher>, url: Url) -> Self {
        Self { fetcher, url }
    }
}

#[async_trait]
impl ChartSource for FloChart {
    fn name(&self) -> &'static str { "flo" }

    async fn fetch_chart(&self) -> Result<Vec<ChartEntry>, ChartError> {
        let body = self.fetcher.get_bytes(Profile::Flo, &self.url).await?;
        let entries = parse_chart(&body)?;
        debug!(entries = entries.len(), "flo.chart.parsed");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RankStatus;
    use serde_json::json;

    fn parse(v: Value) -> Vec<ChartEntry> {
        parse_chart(v.to_string().as_bytes()).unwrap()
    }

    fn chart(tracks: Value) -> Vec<ChartEntry> {
        parse(json!({ "code": "2000000", "data": { "trackList": tracks } }))
    }

    #[test]
    fn representative_artist_wins_over_list() {
        let entries = chart(json!([{
            "id": 1, "name": "Supernova",
            "representationArtist": { "name": "aespa" },
            "artistList": [{ "name": "Karina" }, { "name": "Winter" }]
        }]));
        assert_eq!(entries[0].artist_name.as_deref(), Some("aespa"));
    }

    #[test]
    fn artist_list_is_joined_without_blanks() {
        let entries = chart(json!([{
            "id": 2, "name": "Collab",
            "representationArtist": null,
            "artistList": [{ "name": " Zico " }, { "name": "  " }, null, { "name": "Jennie" }]
        }]));
        assert_eq!(entries[0].artist_name.as_deref(), Some("Zico, Jennie"));
    }

    #[test]
    fn artist_is_none_when_nothing_resolves() {
        let entries = chart(json!([{ "id": 3, "name": "Anon" }]));
        assert_eq!(entries[0].artist_name, None);
    }

    #[test]
    fn album_art_prefers_template_then_sized_image() {
        let entries = chart(json!([
            {
                "name": "A",
                "album": { "title": "Alb", "img": { "urlFormat": "https://cdn/x_{size}.jpg" } }
            },
            {
                "name": "B",
                "album": {
                    "img": { "urlFormat": "" },
                    "imgList": [
                        { "size": 75, "url": "https://cdn/75.jpg" },
                        { "size": "350", "url": "https://cdn/350.jpg" }
                    ]
                }
            },
            { "name": "C", "album": null }
        ]));
        assert_eq!(entries[0].album_art.as_deref(), Some("https://cdn/x_350.jpg"));
        assert_eq!(entries[0].album_name, "Alb");
        assert_eq!(entries[1].album_art.as_deref(), Some("https://cdn/350.jpg"));
        assert_eq!(entries[2].album_art, None);
        assert_eq!(entries[2].album_name, "");
    }

    #[test]
    fn rank_status_from_flags_and_badge() {
        let entries = chart(json!([
            { "name": "new",  "rank": { "newYn": "Y", "rankBadge": 9 } },
            { "name": "up",   "rank": { "newYn": "N", "rankBadge": 5 } },
            { "name": "down", "rank": { "rankBadge": -3 } },
            { "name": "flat", "rank": { "newYn": "N", "rankBadge": 0 } },
            { "name": "none" }
        ]));
        let got: Vec<_> = entries.iter().map(|e| (e.rank_status, e.changed_rank)).collect();
        assert_eq!(got, vec![
            (RankStatus::New, 0),
            (RankStatus::Up, 5),
            (RankStatus::Down, 3),
            (RankStatus::Static, 0),
            (RankStatus::Static, 0)
        ]);
    }

    #[test]
    fn rank_follows_array_position() {
        let entries = chart(json!([
            { "id": 10, "name": "one" },
            { "id": 11, "name": "   " },
            { "id": "12", "name": "three" }
        ]));
        let ranks: Vec<_> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 3]);
        assert_eq!(entries[1].song_id.as_deref(), Some("12"));
    }

    #[test]
    fn missing_track_list_is_empty_chart() {
        assert!(parse(json!({ "data": null })).is_empty());
        assert!(parse(json!({ "data": { "trackList": null } })).is_empty());
        assert!(parse(json!({})).is_empty());
    }

    #[test]
    fn unexpected_types_do_not_fail_the_payload() {
        let entries = chart(json!([{
            "id": { "nested": true },
            "name": "odd",
            "rank": { "newYn": true, "rankBadge": "n/a" },
            "extra": [1, 2, 3]
        }]));
        assert_eq!(entries[0].song_id, None);
        assert_eq!(entries[0].rank_status, RankStatus::New);
    }

    #[test]
    fn mistyped_title_is_coerced_not_fatal() {
        let entries = chart(json!([
            { "id": 1, "name": "fine" },
            { "id": 2, "name": 1989 },
            { "id": 3, "name": { "ko": "object" } }
        ]));
        let got: Vec<_> = entries.iter().map(|e| (e.rank, e.title.as_str())).collect();
        assert_eq!(got, vec![(1, "fine"), (2, "1989")]);
    }

    #[test]
    fn mistyped_nested_objects_become_empty_fields() {
        let entries = chart(json!([{
            "name": "odd shapes",
            "album": "not-an-object",
            "representationArtist": "aespa",
            "artistList": [{ "name": "Karina" }, "Winter", { "name": 7 }],
            "rank": 5
        }]));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].album_name, "");
        assert_eq!(entries[0].album_art, None);
        assert_eq!(entries[0].artist_name.as_deref(), Some("Karina, 7"));
        assert_eq!(entries[0].rank_status, RankStatus::Static);
    }

    #[test]
    fn malformed_track_drops_only_itself() {
        let entries = chart(json!([{ "name": "one" }, "garbage", 42, { "name": "four" }]));
        let ranks: Vec<_> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 4]);
    }

    #[test]
    fn non_array_track_list_is_empty_chart() {
        assert!(parse(json!({ "data": { "trackList": {} } })).is_empty());
        assert!(parse(json!({ "data": { "trackList": "none" } })).is_empty());
        assert!(parse(json!({ "data": [] })).is_empty());
        assert!(parse(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn non_json_body_is_parse_error() {
        assert!(matches!(parse_chart(b"<html>"), Err(ChartError::Parse(_))));
    }
}
