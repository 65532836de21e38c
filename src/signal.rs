//! Signal graph boundary
//!
//! The dataflow layer that decides which terminals are wired together lives
//! outside this crate. It is seen here only as a [`SignalMap`] snapshot plus
//! a [`SignalSource`] that pushes a fresh snapshot to subscribers whenever the
//! wiring changes. [`SignalBus`] is an in-memory source for hosts that do not
//! bring their own.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::layout::{LayoutError, LayoutKey};

/// A terminal of a specific element taking part in a signal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub element: LayoutKey,
    pub terminal: String,
}

impl Endpoint {
    pub fn new(element: impl Into<LayoutKey>, terminal: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            terminal: terminal.into(),
        }
    }

    /// Layout key of the terminal element
    pub fn key(&self) -> LayoutKey {
        self.element.child(&self.terminal)
    }
}

/// Writers and readers of one signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Writers; a valid signal has at most one
    #[serde(default)]
    pub signal_in: Vec<Endpoint>,
    /// Readers
    #[serde(default)]
    pub signal_out: Vec<Endpoint>,
}

impl Signal {
    pub fn new(writer: Endpoint) -> Self {
        Self {
            signal_in: vec![writer],
            signal_out: Vec::new(),
        }
    }

    pub fn with_reader(mut self, reader: Endpoint) -> Self {
        self.add_reader(reader);
        self
    }

    pub fn add_writer(&mut self, writer: Endpoint) {
        if !self.signal_in.contains(&writer) {
            self.signal_in.push(writer);
        }
    }

    pub fn add_reader(&mut self, reader: Endpoint) {
        if !self.signal_out.contains(&reader) {
            self.signal_out.push(reader);
        }
    }
}

/// All signals of the graph in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalMap {
    signals: Vec<(String, Signal)>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a signal, keeping its original position on replace
    pub fn insert(&mut self, id: impl Into<String>, signal: Signal) -> Option<Signal> {
        let id = id.into();
        match self.signals.iter_mut().find(|(k, _)| *k == id) {
            Some((_, existing)) => Some(std::mem::replace(existing, signal)),
            None => {
                self.signals.push((id, signal));
                None
            }
        }
    }

    /// Builder-style [`SignalMap::insert`]
    pub fn with(mut self, id: impl Into<String>, signal: Signal) -> Self {
        self.insert(id, signal);
        self
    }

    /// Signal with `id`, created empty if missing
    pub fn entry(&mut self, id: &str) -> &mut Signal {
        let pos = match self.signals.iter().position(|(k, _)| k == id) {
            Some(pos) => pos,
            None => {
                self.signals.push((id.to_string(), Signal::default()));
                self.signals.len() - 1
            }
        };
        &mut self.signals[pos].1
    }

    pub fn get(&self, id: &str) -> Option<&Signal> {
        self.signals.iter().find(|(k, _)| k == id).map(|(_, s)| s)
    }

    pub fn remove(&mut self, id: &str) -> Option<Signal> {
        let pos = self.signals.iter().position(|(k, _)| k == id)?;
        Some(self.signals.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Signal)> {
        self.signals.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Element-level dependency edges: every writer element feeds every
    /// reader element of the same signal
    pub fn dependencies(&self) -> Vec<(LayoutKey, LayoutKey)> {
        let mut edges = Vec::new();
        for (_, signal) in self.iter() {
            for writer in &signal.signal_in {
                for reader in &signal.signal_out {
                    let edge = (writer.element.clone(), reader.element.clone());
                    if !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
            }
        }
        edges
    }
}

impl FromIterator<(String, Signal)> for SignalMap {
    fn from_iter<I: IntoIterator<Item = (String, Signal)>>(iter: I) -> Self {
        let mut map = SignalMap::new();
        for (id, signal) in iter {
            map.insert(id, signal);
        }
        map
    }
}

/// Callback run with the current signals whenever the graph changes
pub type SignalCallback = Box<dyn FnMut(&SignalMap) -> Result<(), LayoutError>>;

/// Anything that can notify layout scopes about signal graph changes
pub trait SignalSource {
    /// Register `callback`; it stays registered until the returned
    /// [`Subscription`] is dropped
    fn subscribe(&self, callback: SignalCallback) -> Subscription;
}

type SharedCallback = Rc<RefCell<SignalCallback>>;

#[derive(Default)]
struct BusState {
    signals: SignalMap,
    subscribers: Vec<(u64, SharedCallback)>,
    next_id: u64,
}

/// In-memory signal graph that notifies subscribers on every change
#[derive(Clone, Default)]
pub struct SignalBus {
    state: Rc<RefCell<BusState>>,
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SignalBus")
            .field("signals", &state.signals)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current signals
    pub fn signals(&self) -> SignalMap {
        self.state.borrow().signals.clone()
    }

    /// Mutate the signal graph, then notify every subscriber once
    pub fn update(&self, f: impl FnOnce(&mut SignalMap)) -> Result<(), LayoutError> {
        f(&mut self.state.borrow_mut().signals);
        self.notify()
    }

    /// Wire `writer` to `reader` through signal `id`
    pub fn connect(&self, id: &str, writer: Endpoint, reader: Endpoint) -> Result<(), LayoutError> {
        self.update(|signals| {
            let signal = signals.entry(id);
            signal.add_writer(writer);
            signal.add_reader(reader);
        })
    }

    /// Remove signal `id` entirely
    pub fn disconnect(&self, id: &str) -> Result<(), LayoutError> {
        self.update(|signals| {
            signals.remove(id);
        })
    }

    /// Replace the whole signal graph
    pub fn replace(&self, signals: SignalMap) -> Result<(), LayoutError> {
        self.update(|current| *current = signals)
    }

    /// Run every subscriber with the current signals, stopping at the first
    /// error
    pub fn notify(&self) -> Result<(), LayoutError> {
        let (signals, callbacks) = {
            let state = self.state.borrow();
            let callbacks: Vec<SharedCallback> =
                state.subscribers.iter().map(|(_, cb)| Rc::clone(cb)).collect();
            (state.signals.clone(), callbacks)
        };
        for callback in callbacks {
            (callback.borrow_mut())(&signals)?;
        }
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

impl SignalSource for SignalBus {
    fn subscribe(&self, callback: SignalCallback) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, Rc::new(RefCell::new(callback))));
        Subscription {
            id,
            bus: Rc::downgrade(&self.state),
        }
    }
}

/// Keeps a [`SignalSource`] subscription alive; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<BusState>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.bus.upgrade() {
            state.borrow_mut().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
