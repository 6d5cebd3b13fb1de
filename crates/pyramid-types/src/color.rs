//! Connection colors.
//!
//! Dependency edges are drawn in one of ten canonical colors. A project's
//! palette is an ordered subset of these; nothing outside the master set is
//! ever a valid palette or edge color. On the wire a color is its lowercase
//! `#rrggbb` hex string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// One of the ten canonical connection colors, in master-palette order.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Color {
    #[serde(rename = "#6366f1")]
    #[strum(serialize = "#6366f1", serialize = "indigo")]
    Indigo,
    #[serde(rename = "#10b981")]
    #[strum(serialize = "#10b981", serialize = "green")]
    Green,
    #[serde(rename = "#f59e0b")]
    #[strum(serialize = "#f59e0b", serialize = "amber")]
    Amber,
    #[serde(rename = "#ec4899")]
    #[strum(serialize = "#ec4899", serialize = "pink")]
    Pink,
    #[serde(rename = "#6b7280")]
    #[strum(serialize = "#6b7280", serialize = "gray", serialize = "grey")]
    Gray,
    #[serde(rename = "#3b82f6")]
    #[strum(serialize = "#3b82f6", serialize = "blue")]
    Blue,
    #[serde(rename = "#22c55e")]
    #[strum(serialize = "#22c55e", serialize = "emerald")]
    Emerald,
    #[serde(rename = "#ef4444")]
    #[strum(serialize = "#ef4444", serialize = "red")]
    Red,
    #[serde(rename = "#f97316")]
    #[strum(serialize = "#f97316", serialize = "orange")]
    Orange,
    #[serde(rename = "#06b6d4")]
    #[strum(serialize = "#06b6d4", serialize = "cyan")]
    Cyan,
}

impl Default for Color {
    fn default() -> Self {
        Self::first()
    }
}

impl Color {
    /// First entry of the master palette; the seed for fresh palettes.
    pub const fn first() -> Self {
        Color::Indigo
    }

    /// All master colors in canonical order.
    pub fn master() -> impl Iterator<Item = Color> {
        Color::iter()
    }

    /// Parse a hex string or color name (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s.trim()).ok()
    }

    /// Lowercase `#rrggbb` form used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Indigo => "#6366f1",
            Color::Green => "#10b981",
            Color::Amber => "#f59e0b",
            Color::Pink => "#ec4899",
            Color::Gray => "#6b7280",
            Color::Blue => "#3b82f6",
            Color::Emerald => "#22c55e",
            Color::Red => "#ef4444",
            Color::Orange => "#f97316",
            Color::Cyan => "#06b6d4",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Color::Indigo => "indigo",
            Color::Green => "green",
            Color::Amber => "amber",
            Color::Pink => "pink",
            Color::Gray => "gray",
            Color::Blue => "blue",
            Color::Emerald => "emerald",
            Color::Red => "red",
            Color::Orange => "orange",
            Color::Cyan => "cyan",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
