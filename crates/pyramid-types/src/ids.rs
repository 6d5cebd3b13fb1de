//! Typed identifiers for projects and blocks.
//!
//! Both ID types wrap an opaque string. The persistence service owns id
//! generation; locally minted ids are UUIDv4 text, matching what the stores
//! in this workspace hand out. The `short()` form (first 8 characters) is for
//! human-facing output only, never a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A project identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

/// A block identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Mint a fresh random ID (UUIDv4 text).
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Wrap an existing opaque ID.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for display only.
            pub fn short(&self) -> &str {
                let end = self
                    .0
                    .char_indices()
                    .nth(8)
                    .map(|(i, _)| i)
                    .unwrap_or(self.0.len());
                &self.0[..end]
            }

            /// Check if a query string matches this ID by prefix.
            pub fn matches_prefix(&self, prefix: &str) -> bool {
                self.0.starts_with(prefix)
            }

            /// Consume into the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_string_id!(ProjectId, "ProjectId");
impl_string_id!(BlockId, "BlockId");

// ── Prefix resolution ───────────────────────────────────────────────────────

/// Error from ambiguous prefix resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("ambiguous prefix '{prefix}': matches {candidates:?}")]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Resolve a query string against a set of block IDs and their titles.
///
/// Resolution order:
/// 1. Exact ID match
/// 2. Exact title match (must be unique)
/// 3. Unique ID prefix match
/// 4. Error (no match or ambiguous)
pub fn resolve_block_prefix<'a>(
    blocks: impl Iterator<Item = (&'a BlockId, &'a str)>,
    query: &str,
) -> Result<BlockId, PrefixError> {
    let entries: Vec<(&BlockId, &str)> = blocks.collect();

    // 1. Exact id
    if let Some((id, _)) = entries.iter().find(|(id, _)| id.as_str() == query) {
        return Ok((*id).clone());
    }

    // 2. Exact title
    let titled: Vec<&BlockId> = entries
        .iter()
        .filter(|(_, title)| *title == query)
        .map(|(id, _)| *id)
        .collect();
    match titled.len() {
        0 => {}
        1 => return Ok(titled[0].clone()),
        _ => {
            return Err(PrefixError::Ambiguous {
                prefix: query.to_string(),
                candidates: titled.iter().map(|id| id.short().to_string()).collect(),
            });
        }
    }

    // 3. Unique id prefix
    let prefixed: Vec<&BlockId> = entries
        .iter()
        .filter(|(id, _)| id.matches_prefix(query))
        .map(|(id, _)| *id)
        .collect();

    match prefixed.len() {
        0 => Err(PrefixError::NoMatch(query.to_string())),
        1 => Ok(prefixed[0].clone()),
        _ => Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: prefixed.iter().map(|id| id.short().to_string()).collect(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_is_8_chars() {
        let id = ProjectId::generate();
        assert_eq!(id.short().len(), 8);
        assert_eq!(BlockId::new("b1").short(), "b1");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = BlockId::new("b1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b1\"");
        let back: BlockId = serde_json::from_str("\"b1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_debug_uses_short_form() {
        let id = BlockId::new("0123456789abcdef");
        assert_eq!(format!("{id:?}"), "BlockId(01234567)");
        assert_eq!(format!("{id}"), "0123456789abcdef");
    }

    fn sample() -> Vec<(BlockId, String)> {
        vec![
            (BlockId::new("aa11"), "Foundation".to_string()),
            (BlockId::new("aa22"), "Goal".to_string()),
            (BlockId::new("bb33"), "Goal".to_string()),
        ]
    }

    #[test]
    fn test_resolve_exact_id() {
        let blocks = sample();
        let id = resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "aa11").unwrap();
        assert_eq!(id.as_str(), "aa11");
    }

    #[test]
    fn test_resolve_unique_title() {
        let blocks = sample();
        let id =
            resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "Foundation").unwrap();
        assert_eq!(id.as_str(), "aa11");
    }

    #[test]
    fn test_resolve_duplicate_title_is_ambiguous() {
        let blocks = sample();
        let err = resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "Goal").unwrap_err();
        assert!(matches!(err, PrefixError::Ambiguous { .. }));
    }

    #[test]
    fn test_resolve_prefix() {
        let blocks = sample();
        let id = resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "bb").unwrap();
        assert_eq!(id.as_str(), "bb33");

        let err = resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "aa").unwrap_err();
        assert!(matches!(err, PrefixError::Ambiguous { .. }));

        let err = resolve_block_prefix(blocks.iter().map(|(i, t)| (i, t.as_str())), "zz").unwrap_err();
        assert!(matches!(err, PrefixError::NoMatch(_)));
    }
}
