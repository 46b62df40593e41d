use serde::{Deserialize, Serialize};

/// Week over week movement of a chart entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankStatus {
    New,
    Up,
    Down,
    Static
}

/// One chart row, whichever site it came from. Built once by an adapter and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    pub rank: u32,
    pub artist_name: Option<String>,
    pub title: String,
    pub album_name: String,
    pub album_art: Option<String>,
    pub song_id: Option<String>,
    pub rank_status: RankStatus,
    pub changed_rank: u32
}

/// Result row of the album / song lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub title: String,
    pub number: String
}

/// Upgrades protocol relative urls (`//host/a.jpg`) to https, drops blanks.
pub fn normalize_art_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("//") {
        Some(format!("https:{raw}"))
    } else {
        Some(raw.to_string())
    }
}

/// Some(trimmed) unless blank
pub fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
