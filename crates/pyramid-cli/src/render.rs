//! Plain-text rendering of a project session.

use std::fmt::Write;

use pyramid_engine::{ColorPalette, ProjectSession};
use pyramid_types::{Block, BlockId, DependencyEdge, Level};

/// One-line summary: short id, level, order, title, category.
pub fn block_line(block: &Block) -> String {
    let mut line = format!(
        "{}  {:>4} #{:<3} {}",
        block.id.short(),
        block.level.to_string(),
        block.order,
        block.title
    );
    if let Some(category) = block.category.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(line, "  [{category}]");
    }
    line
}

/// `from -> to (color)` using titles where known.
pub fn edge_line(session: &ProjectSession, edge: &DependencyEdge) -> String {
    let color = edge.color.map(|c| c.name()).unwrap_or("uncolored");
    format!(
        "{} -> {} ({color})",
        title(session, &edge.from),
        title(session, &edge.to)
    )
}

fn title<'a>(session: &'a ProjectSession, id: &'a BlockId) -> &'a str {
    session
        .block(id)
        .map(|b| b.title.as_str())
        .unwrap_or_else(|| id.short())
}

pub fn palette(palette: &ColorPalette) -> String {
    let mut out = String::new();
    for color in palette.colors() {
        let marker = if *color == palette.selected() { "*" } else { " " };
        let _ = writeln!(out, "{marker} {color}  {}", color.name());
    }
    out
}

/// Full project view, apex tier first.
pub fn project(session: &ProjectSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "project {}", session.project());

    for level in (0..=session.max_display_level()).rev() {
        let tier = session.tier(Level::new(level));
        let _ = writeln!(out, "\n== Tier {level} ==");
        if tier.is_empty() {
            let _ = writeln!(out, "  (empty)");
        }
        for block in tier {
            let _ = writeln!(out, "  {}", block_line(block));
        }
    }

    let pool = session.pool();
    let _ = writeln!(out, "\n== Pool ({}) ==", pool.len());
    for block in pool {
        let _ = writeln!(out, "  {}", block_line(block));
    }

    if !session.graph().is_empty() {
        let _ = writeln!(out, "\n== Dependencies ==");
        for edge in session.graph().edges() {
            let _ = writeln!(out, "  {}", edge_line(session, &edge));
        }
    }

    let _ = writeln!(out, "\n== Palette ==");
    out.push_str(&palette(session.palette()));

    if let Some(note) = session.arrangement_note() {
        let _ = writeln!(out, "\n== Arrangement ==\n{note}");
    }
    out
}
