//! Per-project color palette.
//!
//! The palette is an ordered, duplicate-free subset of the master colors,
//! plus a locally selected color used for new connections. It is created
//! lazily: the first load of a project with no usable palette seeds and
//! persists `[indigo]`. Colors are only ever added.

use tracing::{debug, warn};

use pyramid_types::{Color, ProjectId};

use crate::error::{EngineError, Result};
use crate::store::PersistenceService;

/// Enabled colors and the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    colors: Vec<Color>,
    selected: Color,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::seed()
    }
}

impl ColorPalette {
    /// A fresh palette holding only the first master color.
    pub fn seed() -> Self {
        Self {
            colors: vec![Color::first()],
            selected: Color::first(),
        }
    }

    /// Parse a stored palette. Returns `None` when it is empty or holds any
    /// string that is not a master color. Repeats are dropped.
    pub fn from_stored(stored: &[String]) -> Option<Self> {
        let mut colors = Vec::with_capacity(stored.len());
        for raw in stored {
            let color = Color::from_str(raw)?;
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
        let selected = *colors.first()?;
        Some(Self { colors, selected })
    }

    /// Wire form, in palette order.
    pub fn to_stored(&self) -> Vec<String> {
        Self::stored(&self.colors)
    }

    fn stored(colors: &[Color]) -> Vec<String> {
        colors.iter().map(|c| c.as_str().to_string()).collect()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn selected(&self) -> Color {
        self.selected
    }

    pub fn contains(&self, color: Color) -> bool {
        self.colors.contains(&color)
    }

    /// Master colors not yet enabled, in master order.
    pub fn available(&self) -> Vec<Color> {
        Color::master().filter(|c| !self.contains(*c)).collect()
    }

    /// Change the selection. Local only.
    pub fn select(&mut self, color: Color) -> Result<()> {
        if !self.contains(color) {
            return Err(EngineError::ColorNotInPalette(color));
        }
        self.selected = color;
        Ok(())
    }

    /// Append and select `color`. Returns `false` if it was already enabled.
    fn push(&mut self, color: Color) -> bool {
        if self.contains(color) {
            return false;
        }
        self.colors.push(color);
        self.selected = color;
        true
    }
}

/// Load a project's palette, seeding it when absent or invalid.
///
/// Never fails: a failed read falls back to the seed without persisting,
/// and a failed seed write is logged and ignored.
pub async fn load_palette(store: &dyn PersistenceService, project: &ProjectId) -> ColorPalette {
    let stored = match store.get_color_palette(project).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(project = %project, error = %e, "failed to read color palette, using default");
            return ColorPalette::seed();
        }
    };

    if let Some(palette) = ColorPalette::from_stored(&stored) {
        return palette;
    }

    let palette = ColorPalette::seed();
    debug!(project = %project, stored = ?stored, "seeding color palette");
    if let Err(e) = store.set_color_palette(project, palette.to_stored()).await {
        warn!(project = %project, error = %e, "failed to persist seeded color palette");
    }
    palette
}

/// Enable `color` for a project.
///
/// The full new palette is persisted first; the local palette only changes
/// (and selects the new color) once the write succeeds. Adding an enabled
/// color is a no-op that returns `false`.
pub async fn add_color(
    store: &dyn PersistenceService,
    project: &ProjectId,
    palette: &mut ColorPalette,
    color: Color,
) -> Result<bool> {
    if palette.contains(color) {
        return Ok(false);
    }
    let mut next = palette.colors.clone();
    next.push(color);
    store
        .set_color_palette(project, ColorPalette::stored(&next))
        .await?;
    Ok(palette.push(color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn strings(colors: &[&str]) -> Vec<String> {
        colors.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_stored() {
        assert_eq!(ColorPalette::from_stored(&[]), None);
        assert_eq!(
            ColorPalette::from_stored(&strings(&["#6366f1", "#123456"])),
            None
        );

        let palette = ColorPalette::from_stored(&strings(&["#10b981", "#ec4899", "#10b981"])).unwrap();
        assert_eq!(palette.colors(), &[Color::Green, Color::Pink]);
        assert_eq!(palette.selected(), Color::Green);
    }

    #[test]
    fn test_select_requires_enabled_color() {
        let mut palette = ColorPalette::seed();
        assert!(matches!(
            palette.select(Color::Red),
            Err(EngineError::ColorNotInPalette(Color::Red))
        ));
        assert_eq!(palette.selected(), Color::Indigo);
    }

    #[test]
    fn test_available_excludes_enabled() {
        let palette = ColorPalette::seed();
        let available = palette.available();
        assert_eq!(available.len(), 9);
        assert!(!available.contains(&Color::Indigo));
    }

    #[tokio::test]
    async fn test_load_seeds_empty_palette() {
        let store = MemoryStore::new();
        let project = ProjectId::new("p");
        let palette = load_palette(&store, &project).await;

        assert_eq!(palette, ColorPalette::seed());
        assert_eq!(
            store.get_color_palette(&project).await.unwrap(),
            strings(&["#6366f1"])
        );
    }

    #[tokio::test]
    async fn test_load_replaces_invalid_palette() {
        let store = MemoryStore::new();
        let project = ProjectId::new("p");
        store
            .set_color_palette(&project, strings(&["#10b981", "chartreuse"]))
            .await
            .unwrap();

        let palette = load_palette(&store, &project).await;
        assert_eq!(palette.colors(), &[Color::Indigo]);
        assert_eq!(
            store.get_color_palette(&project).await.unwrap(),
            strings(&["#6366f1"])
        );
    }

    #[tokio::test]
    async fn test_load_valid_palette_selects_first() {
        let store = MemoryStore::new();
        let project = ProjectId::new("p");
        store
            .set_color_palette(&project, strings(&["#f59e0b", "#6366f1"]))
            .await
            .unwrap();

        let palette = load_palette(&store, &project).await;
        assert_eq!(palette.selected(), Color::Amber);
        assert_eq!(palette.colors().len(), 2);
    }

    #[tokio::test]
    async fn test_add_color_persists_then_selects() {
        let store = MemoryStore::new();
        let project = ProjectId::new("p");
        let mut palette = load_palette(&store, &project).await;

        assert!(add_color(&store, &project, &mut palette, Color::Cyan).await.unwrap());
        assert_eq!(palette.selected(), Color::Cyan);
        assert_eq!(
            store.get_color_palette(&project).await.unwrap(),
            strings(&["#6366f1", "#06b6d4"])
        );

        assert!(!add_color(&store, &project, &mut palette, Color::Cyan).await.unwrap());
        assert_eq!(palette.colors().len(), 2);
    }
}
