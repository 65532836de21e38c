//! Derive solver links from the signal graph

use super::error::LayoutError;
use super::key::{index_of, LayoutKey};
use super::types::Link;
use crate::signal::SignalMap;

/// One link from the writer terminal to each reader terminal of every
/// signal, as positions in `nodes`.
///
/// A signal with more than one writer is rejected. A signal without a
/// writer yields no links.
pub fn links_for<E>(signals: &SignalMap, nodes: &[(LayoutKey, E)]) -> Result<Vec<Link>, LayoutError> {
    let mut links = Vec::new();
    for (id, signal) in signals.iter() {
        let writer = match signal.signal_in.as_slice() {
            [] => {
                if !signal.signal_out.is_empty() {
                    tracing::debug!(signal = id, readers = signal.signal_out.len(), "signal has no writer");
                }
                continue;
            }
            [writer] => writer,
            writers => {
                return Err(LayoutError::multiple_writers(
                    id,
                    writers.iter().map(|w| w.key().to_string()).collect(),
                ))
            }
        };

        let source = terminal_index(nodes, &writer.element, &writer.terminal)?;
        for reader in &signal.signal_out {
            let target = terminal_index(nodes, &reader.element, &reader.terminal)?;
            links.push(Link { source, target });
        }
    }
    Ok(links)
}

fn terminal_index<E>(nodes: &[(LayoutKey, E)], element: &LayoutKey, terminal: &str) -> Result<usize, LayoutError> {
    index_of(nodes, element.as_str(), terminal).ok_or_else(|| LayoutError::unresolved(element.child(terminal)))
}
