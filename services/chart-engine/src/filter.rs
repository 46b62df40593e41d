use crate::types::ChartEntry;

/// Trimmed artist query, or None when there is nothing to filter by.
pub fn needle(artist: Option<&str>) -> Option<&str> {
    artist.map(str::trim).filter(|s| !s.is_empty())
}

/// Case sensitive substring test; entries without an artist never match.
pub fn matches(artist_name: Option<&str>, needle: &str) -> bool {
    artist_name.is_some_and(|name| name.contains(needle))
}

/// Entries whose artist contains the query. Blank or absent queries
/// return the input as is.
pub fn by_artist(entries: &[ChartEntry], artist: Option<&str>) -> Vec<ChartEntry> {
    match needle(artist) {
        Some(needle) => entries.iter()
            .filter(|e| matches(e.artist_name.as_deref(), needle))
            .cloned()
            .collect(),
        None => entries.to_vec()
    }
}
