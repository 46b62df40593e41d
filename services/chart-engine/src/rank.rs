//!
//! src/rank.rs  Andrew Belles  Oct 3rd, 2026
//!
//! Classifies chart movement into new / up / down / static plus a
//! magnitude, from whichever indicator a site exposes
//!

use std::sync::LazyLock;

use regex::Regex;

use crate::types::RankStatus;

static FIRST_INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+").expect("integer regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankMovement {
    pub status: RankStatus,
    pub changed: u32
}

impl RankMovement {
    pub const STATIC: RankMovement = RankMovement { status: RankStatus::Static, changed: 0 };
    pub const NEW: RankMovement = RankMovement { status: RankStatus::New, changed: 0 };

    pub fn up(by: u32) -> Self { Self { status: RankStatus::Up, changed: by } }
    pub fn down(by: u32) -> Self { Self { status: RankStatus::Down, changed: by } }

    /// Signed badge: positive climbed, negative fell, zero or missing held.
    pub fn from_badge(badge: Option<i64>) -> Self {
        match badge {
            None | Some(0) => Self::STATIC,
            Some(b) => {
                let magnitude = u32::try_from(b.unsigned_abs()).unwrap_or(u32::MAX);
                if b > 0 { Self::up(magnitude) } else { Self::down(magnitude) }
            }
        }
    }

    /// A truthy new flag beats whatever the badge says.
    pub fn from_flags(new_flag: Option<&str>, badge: Option<i64>) -> Self {
        if is_truthy(new_flag) {
            Self::NEW
        } else {
            Self::from_badge(badge)
        }
    }

    pub fn from_marker(kind: MarkerKind, text: &str) -> Self {
        match kind {
            MarkerKind::Up => Self::up(first_integer(text).unwrap_or(0)),
            MarkerKind::Down => Self::down(first_integer(text).unwrap_or(0)),
            MarkerKind::New | MarkerKind::Reentry => Self::NEW,
            MarkerKind::Unchanged => Self::STATIC
        }
    }
}

/// "y", "yes", "true" in any case, surrounding whitespace ignored.
pub fn is_truthy(flag: Option<&str>) -> bool {
    match flag {
        Some(v) => {
            let v = v.trim().to_ascii_lowercase();
            v == "y" || v == "yes" || v == "true"
        }
        None => false
    }
}

/// First run of digits in `text`, if it fits a u32.
pub fn first_integer(text: &str) -> Option<u32> {
    FIRST_INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Movement markers rendered inside an html rank cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Up,
    Down,
    Unchanged,
    New,
    Reentry
}

impl MarkerKind {
    pub fn from_class(class: &str) -> Option<MarkerKind> {
        match class {
            "rank-up"   => Some(MarkerKind::Up),
            "rank-down" => Some(MarkerKind::Down),
            "rank-none" => Some(MarkerKind::Unchanged),
            "rank-new"  => Some(MarkerKind::New),
            "rank-re"   => Some(MarkerKind::Reentry),
            _ => None
        }
    }

    /// First recognised class wins when an element carries several.
    pub fn from_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<MarkerKind> {
        classes.into_iter().find_map(MarkerKind::from_class)
    }
}
