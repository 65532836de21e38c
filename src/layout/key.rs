//! Hierarchical addressing of layout elements
//!
//! Every registered element is addressed by a dot-separated path built from
//! its parent's key and its own id. Terminals of a node live one level below
//! the node, e.g. `adder.out`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::LayoutError;

/// Separator between path segments of a [`LayoutKey`]
pub const SEPARATOR: char = '.';

/// Hierarchical identifier of a layout element
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutKey(String);

impl LayoutKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key of a child element nested under this one
    pub fn child(&self, name: &str) -> LayoutKey {
        layout_key(&self.0, name)
    }

    /// Key of the enclosing element, if any
    pub fn parent(&self) -> Option<LayoutKey> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| LayoutKey::new(parent))
    }

    /// Last path segment
    pub fn leaf(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map_or(self.0.as_str(), |(_, leaf)| leaf)
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayoutKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for LayoutKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Join a parent id and a child id into a layout key.
///
/// An empty side is dropped, so `layout_key("a", "")` is `a` and
/// `layout_key("", "b")` is `b`. Distinct sibling names map to distinct keys
/// as long as they do not contain [`SEPARATOR`].
pub fn layout_key(parent: &str, child: &str) -> LayoutKey {
    match (parent.is_empty(), child.is_empty()) {
        (_, true) => LayoutKey::new(parent),
        (true, false) => LayoutKey::new(child),
        (false, false) => LayoutKey(format!("{parent}{SEPARATOR}{child}")),
    }
}

/// Whether `name` may be used as a single key segment
pub fn is_valid_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR)
}

/// Position of the element addressed by `(layout_id, prop)` in `nodes`.
///
/// Scans the whole list; if a key occurs more than once the last match wins.
pub fn index_of<E>(nodes: &[(LayoutKey, E)], layout_id: &str, prop: &str) -> Option<usize> {
    let key = layout_key(layout_id, prop);
    nodes
        .iter()
        .enumerate()
        .filter(|(_, (candidate, _))| *candidate == key)
        .map(|(i, _)| i)
        .last()
}

/// Resolve a key to its position in `nodes`, failing if it is not present
pub fn resolve<E>(nodes: &[(LayoutKey, E)], key: &LayoutKey) -> Result<usize, LayoutError> {
    index_of(nodes, key.as_str(), "").ok_or_else(|| LayoutError::unresolved(key.clone()))
}
