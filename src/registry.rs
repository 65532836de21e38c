//! Registry of mounted layout elements
//!
//! A [`LayoutScope`] is the explicit context components mount into. Mounting
//! a node registers the node itself plus one synthesized element per
//! terminal; the returned [`MountedElement`] owns those registrations and
//! removes them again when it is dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::ConfigError;
use crate::layout::builder::{constraints_for, terminal_layouts};
use crate::layout::key::{is_valid_segment, SEPARATOR};
use crate::layout::{DiagramProps, LayoutConfig, LayoutElement, LayoutKey, LayoutType};
use crate::style::{Style, StyleBuffer, StyleSetter};

#[derive(Debug)]
struct Entry {
    element: LayoutElement,
    generation: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<(LayoutKey, Entry)>,
    next_generation: u64,
}

impl RegistryState {
    fn position(&self, key: &LayoutKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Remove every entry nested anywhere under `group`
    fn remove_nested(&mut self, group: &LayoutKey) -> Vec<LayoutKey> {
        let prefix = format!("{}{}", group, SEPARATOR);
        let mut removed = Vec::new();
        self.entries.retain(|(key, _)| {
            let nested = key.as_str().starts_with(&prefix);
            if nested {
                removed.push(key.clone());
            }
            !nested
        });
        removed
    }
}

/// Elements keyed by [`LayoutKey`] in first-insertion order.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `element`, replacing any entry with the same key in place
    pub fn register(&self, element: LayoutElement, styles: &Rc<RefCell<StyleBuffer>>) -> Registration {
        let key = element.key.clone();
        let generation = {
            let mut state = self.state.borrow_mut();
            let generation = state.next_generation;
            state.next_generation += 1;
            let entry = Entry { element, generation };
            match state.position(&key) {
                Some(i) => state.entries[i].1 = entry,
                None => state.entries.push((key.clone(), entry)),
            }
            generation
        };
        styles.borrow_mut().ensure_keys([&key]);
        tracing::trace!(key = %key, generation, "registered element");

        Registration {
            key,
            generation,
            registry: Rc::downgrade(&self.state),
            styles: Rc::downgrade(styles),
        }
    }

    /// Copy of every registered element, in registry order
    pub fn snapshot(&self) -> Vec<(LayoutKey, LayoutElement)> {
        self.state
            .borrow()
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.element.clone()))
            .collect()
    }

    pub fn get(&self, key: &LayoutKey) -> Option<LayoutElement> {
        let state = self.state.borrow();
        state.position(key).map(|i| state.entries[i].1.element.clone())
    }

    pub fn contains(&self, key: &LayoutKey) -> bool {
        self.state.borrow().position(key).is_some()
    }

    pub fn keys(&self) -> Vec<LayoutKey> {
        self.state.borrow().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }
}

/// Disposer for one registry entry; dropping it removes the entry.
///
/// If the key has been registered again since, the newer entry is left alone.
#[must_use = "dropping a Registration removes the element immediately"]
pub struct Registration {
    key: LayoutKey,
    generation: u64,
    registry: Weak<RefCell<RegistryState>>,
    styles: Weak<RefCell<StyleBuffer>>,
}

impl Registration {
    pub fn key(&self) -> &LayoutKey {
        &self.key
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(state) = self.registry.upgrade() else {
            return;
        };
        let removed = {
            let mut state = state.borrow_mut();
            match state.position(&self.key) {
                Some(i) if state.entries[i].1.generation == self.generation => {
                    let (key, entry) = state.entries.remove(i);
                    let mut removed = vec![key];
                    if entry.element.layout_type == LayoutType::Group {
                        removed.extend(state.remove_nested(&self.key));
                    }
                    removed
                }
                _ => Vec::new(),
            }
        };
        if removed.is_empty() {
            return;
        }
        if let Some(styles) = self.styles.upgrade() {
            let mut styles = styles.borrow_mut();
            for key in &removed {
                styles.remove(key);
            }
        }
        tracing::trace!(key = %self.key, removed = removed.len(), "unregistered element");
    }
}

/// The context components mount their layout declarations into.
///
/// Owns the registry and the style buffer solved positions are written to.
/// Cloning yields another handle to the same scope.
#[derive(Debug, Clone, Default)]
pub struct LayoutScope {
    registry: LayoutRegistry,
    styles: Rc<RefCell<StyleBuffer>>,
    config: LayoutConfig,
}

impl LayoutScope {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            registry: LayoutRegistry::new(),
            styles: Rc::new(RefCell::new(StyleBuffer::new())),
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    pub fn styles(&self) -> &Rc<RefCell<StyleBuffer>> {
        &self.styles
    }

    /// Current style of `key`
    pub fn style(&self, key: &str) -> Option<Style> {
        self.styles.borrow().get(&LayoutKey::from(key)).copied()
    }

    /// Mount a top-level element
    pub fn mount(&self, id: &str, props: DiagramProps) -> Result<MountedElement, ConfigError> {
        self.mount_in(None, id, props)
    }

    /// Mount an element, nested under the group `parent` if given
    pub fn mount_in(
        &self,
        parent: Option<&LayoutKey>,
        id: &str,
        props: DiagramProps,
    ) -> Result<MountedElement, ConfigError> {
        let key = self.key_for(parent, id)?;
        let registrations = self.register(&key, parent, &props)?;
        Ok(MountedElement {
            scope: self.clone(),
            parent: parent.cloned(),
            key,
            props,
            registrations,
        })
    }

    fn key_for(&self, parent: Option<&LayoutKey>, id: &str) -> Result<LayoutKey, ConfigError> {
        if !is_valid_segment(id) {
            return Err(ConfigError::InvalidLayoutId {
                id: id.to_string(),
                span: None,
            });
        }
        match parent {
            None => Ok(LayoutKey::from(id)),
            Some(parent) => {
                let is_group = self
                    .registry
                    .get(parent)
                    .is_some_and(|e| e.layout_type == LayoutType::Group);
                if !is_group {
                    return Err(ConfigError::UnknownParent {
                        element: id.to_string(),
                        parent: parent.to_string(),
                        span: None,
                    });
                }
                Ok(parent.child(id))
            }
        }
    }

    /// Validate `props` and register every element they declare
    fn register(
        &self,
        key: &LayoutKey,
        parent: Option<&LayoutKey>,
        props: &DiagramProps,
    ) -> Result<Vec<Registration>, ConfigError> {
        props.validate(key.as_str())?;

        let node = match props {
            DiagramProps::Node(node) => node,
            DiagramProps::Group => {
                let element = self.element(key, parent, LayoutType::Group, 0.0, 0.0);
                return Ok(vec![self.registry.register(element, &self.styles)]);
            }
            DiagramProps::Link => return Ok(Vec::new()),
        };

        let terminals = terminal_layouts(node, self.config.terminal_height);
        let mut owner = self.element(key, parent, LayoutType::Node, node.width, node.height);
        owner.constraints = constraints_for(key, node.width, &terminals);
        owner.constraints.extend(node.constraints.iter().cloned());

        let mut registrations = vec![self.registry.register(owner, &self.styles)];
        for terminal in &terminals {
            let mut element = self.element(
                &key.child(&terminal.name),
                Some(key),
                LayoutType::Node,
                terminal.width,
                terminal.height,
            );
            element.terminal = Some(terminal.role);
            element.metadata = terminal.metadata.clone();
            registrations.push(self.registry.register(element, &self.styles));
        }
        tracing::debug!(key = %key, terminals = terminals.len(), "mounted node");
        Ok(registrations)
    }

    fn element(
        &self,
        key: &LayoutKey,
        parent: Option<&LayoutKey>,
        layout_type: LayoutType,
        width: f64,
        height: f64,
    ) -> LayoutElement {
        LayoutElement {
            key: key.clone(),
            parent: parent.cloned(),
            layout_type,
            width,
            height,
            terminal: None,
            metadata: None,
            constraints: Vec::new(),
            set_style: StyleSetter::new(key.clone(), &self.styles),
        }
    }
}

/// A mounted declaration and the registry entries it owns.
///
/// Dropping it, or calling [`MountedElement::unmount`], removes the element
/// and its terminals. Unmounting a group also removes every element nested
/// under it; their own handles become inert.
#[must_use = "dropping a MountedElement unmounts it immediately"]
#[derive(Debug)]
pub struct MountedElement {
    scope: LayoutScope,
    parent: Option<LayoutKey>,
    key: LayoutKey,
    props: DiagramProps,
    registrations: Vec<Registration>,
}

impl MountedElement {
    pub fn key(&self) -> &LayoutKey {
        &self.key
    }

    pub fn props(&self) -> &DiagramProps {
        &self.props
    }

    /// Keys this mount registered
    pub fn registered_keys(&self) -> Vec<LayoutKey> {
        self.registrations.iter().map(|r| r.key().clone()).collect()
    }

    /// Replace the declaration.
    ///
    /// Returns `Ok(false)` without touching the registry when `props` equals
    /// the current declaration. On error the previous registrations stay.
    /// Keys the new props declare again keep their position in the registry;
    /// dropping the old registrations removes only the keys no longer
    /// declared.
    pub fn update(&mut self, props: DiagramProps) -> Result<bool, ConfigError> {
        if props == self.props {
            return Ok(false);
        }
        let registrations = self.scope.register(&self.key, self.parent.as_ref(), &props)?;
        self.registrations = registrations;
        self.props = props;
        Ok(true)
    }

    pub fn unmount(self) {}
}
