//! Per-element style records written back from solved layouts
//!
//! A [`StyleBuffer`] holds one absolutely positioned box per layout key.
//! Entries are only ever written through a [`StyleSetter`], which the
//! registry hands to every mounted element.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::layout::{BoundingBox, LayoutKey};

/// CSS-like positioning scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Absolute,
}

/// Resolved box of one element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Style {
    pub position: Position,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Style {
    pub fn from_bounds(bounds: &BoundingBox) -> Self {
        Self {
            position: Position::Absolute,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Style records keyed by layout key, in first-insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuffer {
    entries: Vec<(LayoutKey, Style)>,
    revision: u64,
}

impl StyleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a placeholder for every key not present yet; existing values stay
    pub fn ensure_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a LayoutKey>) {
        let mut added = false;
        for key in keys {
            if self.position(key).is_none() {
                self.entries.push((key.clone(), Style::default()));
                added = true;
            }
        }
        if added {
            self.revision += 1;
        }
    }

    pub fn get(&self, key: &LayoutKey) -> Option<&Style> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Write `style` for `key`, inserting it if missing
    pub fn set(&mut self, key: &LayoutKey, style: Style) {
        match self.position(key) {
            Some(i) => self.entries[i].1 = style,
            None => self.entries.push((key.clone(), style)),
        }
        self.revision += 1;
    }

    pub fn remove(&mut self, key: &LayoutKey) -> Option<Style> {
        let i = self.position(key)?;
        self.revision += 1;
        Some(self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LayoutKey, &Style)> {
        self.entries.iter().map(|(k, s)| (k, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Incremented on every change; observers re-render when it moves
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn position(&self, key: &LayoutKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

/// Writes the style of a single element into its scope's buffer
#[derive(Clone)]
pub struct StyleSetter {
    key: LayoutKey,
    buffer: Weak<RefCell<StyleBuffer>>,
}

impl StyleSetter {
    pub fn new(key: LayoutKey, buffer: &Rc<RefCell<StyleBuffer>>) -> Self {
        Self {
            key,
            buffer: Rc::downgrade(buffer),
        }
    }

    /// A setter whose writes go nowhere
    pub fn detached(key: LayoutKey) -> Self {
        Self {
            key,
            buffer: Weak::new(),
        }
    }

    pub fn key(&self) -> &LayoutKey {
        &self.key
    }

    /// Write `style`; returns false when the buffer is gone
    pub fn set(&self, style: Style) -> bool {
        match self.buffer.upgrade() {
            Some(buffer) => {
                buffer.borrow_mut().set(&self.key, style);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for StyleSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleSetter")
            .field("key", &self.key)
            .field("attached", &(self.buffer.strong_count() > 0))
            .finish()
    }
}
