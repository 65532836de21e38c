//! TOML diagram documents
//!
//! A document declares layout settings, the elements to mount and the
//! signals wiring their terminals together:
//!
//! ```toml
//! [layout]
//! spread = 75
//!
//! [[element]]
//! id = "a"
//! type = "Node"
//! width = 100
//! height = 50
//! outlets = [{ name = "out" }]
//!
//! [[signal]]
//! id = "s1"
//! writers = [{ element = "a", terminal = "out" }]
//! readers = [{ element = "b", terminal = "in" }]
//! ```
//!
//! Declaration errors carry the byte span of the offending value so they can
//! be reported against the source.

use serde::Deserialize;
use toml::Spanned;

use crate::error::{ConfigError, Span};
use crate::layout::{Constraint, LayoutConfig, LayoutKey, RawDiagramProps, TerminalDecl};
use crate::registry::{LayoutScope, MountedElement};
use crate::signal::{Endpoint, Signal, SignalMap};

/// One `[[element]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementDecl {
    pub id: Spanned<String>,
    /// Key of the group this element is nested under
    #[serde(default)]
    pub parent: Option<Spanned<String>>,
    #[serde(rename = "type")]
    pub layout_type: Option<Spanned<String>>,
    pub width: Option<Spanned<f64>>,
    pub height: Option<Spanned<f64>>,
    #[serde(default)]
    pub inlets: Vec<TerminalDecl>,
    #[serde(default)]
    pub outlets: Vec<TerminalDecl>,
    #[serde(default)]
    pub constraints: Vec<Constraint<LayoutKey>>,
}

impl ElementDecl {
    fn id_span(&self) -> Span {
        self.id.span()
    }

    /// Key the element will be registered under
    pub fn key(&self) -> LayoutKey {
        match &self.parent {
            Some(parent) => LayoutKey::from(parent.get_ref().as_str()).child(self.id.get_ref()),
            None => LayoutKey::from(self.id.get_ref().as_str()),
        }
    }

    fn raw_props(&self) -> RawDiagramProps {
        RawDiagramProps {
            layout_type: self.layout_type.as_ref().map(|t| t.get_ref().clone()),
            width: self.width.as_ref().map(|w| *w.get_ref()),
            height: self.height.as_ref().map(|h| *h.get_ref()),
            inlets: self.inlets.clone(),
            outlets: self.outlets.clone(),
            constraints: self.constraints.clone(),
        }
    }

    /// Best source location for `err`
    fn locate(&self, err: ConfigError) -> ConfigError {
        let field = match &err {
            ConfigError::InvalidType { .. } => self.layout_type.as_ref().map(Spanned::span),
            ConfigError::InvalidWidth { .. } => self.width.as_ref().map(Spanned::span),
            ConfigError::InvalidHeight { .. } => self.height.as_ref().map(Spanned::span),
            ConfigError::UnknownParent { .. } => self.parent.as_ref().map(Spanned::span),
            _ => None,
        };
        err.with_span(field.unwrap_or_else(|| self.id_span()))
    }
}

/// One `[[signal]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalDecl {
    pub id: Spanned<String>,
    #[serde(default)]
    pub writers: Vec<Endpoint>,
    #[serde(default)]
    pub readers: Vec<Endpoint>,
}

/// A parsed diagram document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementDecl>,
    #[serde(default, rename = "signal")]
    pub signals: Vec<SignalDecl>,
}

impl Document {
    /// Parse a document, rejecting duplicate element keys and signal ids
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let document: Document = toml::from_str(source).map_err(|e| ConfigError::Document {
            message: e.message().to_string(),
            span: e.span(),
        })?;

        let mut keys: Vec<LayoutKey> = Vec::new();
        for element in &document.elements {
            let key = element.key();
            if keys.contains(&key) {
                return Err(ConfigError::DuplicateElement {
                    key: key.to_string(),
                    span: Some(element.id_span()),
                });
            }
            keys.push(key);
        }

        let mut ids: Vec<&str> = Vec::new();
        for signal in &document.signals {
            if ids.contains(&signal.id.get_ref().as_str()) {
                return Err(ConfigError::Document {
                    message: format!("signal '{}' is declared more than once", signal.id.get_ref()),
                    span: Some(signal.id.span()),
                });
            }
            ids.push(signal.id.get_ref());
        }

        Ok(document)
    }

    /// Scope configured with this document's `[layout]` table
    pub fn scope(&self) -> LayoutScope {
        LayoutScope::new(self.layout.clone())
    }

    /// Mount every element in declaration order.
    ///
    /// A group must be declared before the elements nested under it.
    pub fn mount(&self, scope: &LayoutScope) -> Result<Vec<MountedElement>, ConfigError> {
        let mut mounted = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            let key = element.key();
            let props = element
                .raw_props()
                .into_props(key.as_str())
                .map_err(|e| element.locate(e))?;
            let parent = element.parent.as_ref().map(|p| LayoutKey::from(p.get_ref().as_str()));
            let handle = scope
                .mount_in(parent.as_ref(), element.id.get_ref(), props)
                .map_err(|e| element.locate(e))?;
            mounted.push(handle);
        }
        tracing::debug!(elements = mounted.len(), "mounted document");
        Ok(mounted)
    }

    /// Signals in declaration order
    pub fn signal_map(&self) -> SignalMap {
        self.signals
            .iter()
            .map(|decl| {
                let signal = Signal {
                    signal_in: decl.writers.clone(),
                    signal_out: decl.readers.clone(),
                };
                (decl.id.get_ref().clone(), signal)
            })
            .collect()
    }
}
