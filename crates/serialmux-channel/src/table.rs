use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ChannelError, Result};
use crate::state::{ChannelBinding, ChannelInfo, ChannelState};

/// Index of a channel in its table, resolved once per call from the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelId(usize);

/// Name → bound operations, fixed at construction.
///
/// Also holds a depth snapshot per channel. The snapshot is republished
/// whenever the gate holder finishes touching the state, which lets
/// [`depth`](Self::depth) answer without the lock at the cost of
/// possibly being one operation stale.
pub(crate) struct ChannelTable<S: ChannelState> {
    bindings: Vec<ChannelBinding<S>>,
    index: HashMap<&'static str, ChannelId>,
    depths: Box<[AtomicUsize]>,
}

impl<S: ChannelState> ChannelTable<S> {
    pub(crate) fn new(bindings: Vec<ChannelBinding<S>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(bindings.len());
        for (i, binding) in bindings.iter().enumerate() {
            if index.insert(binding.info.name, ChannelId(i)).is_some() {
                return Err(ChannelError::DuplicateChannel(binding.info.name.to_string()));
            }
        }
        let depths = bindings.iter().map(|_| AtomicUsize::new(0)).collect();

        Ok(Self {
            bindings,
            index,
            depths,
        })
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<ChannelId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))
    }

    pub(crate) fn binding(&self, id: ChannelId) -> &ChannelBinding<S> {
        &self.bindings[id.0]
    }

    pub(crate) fn depth(&self, id: ChannelId) -> usize {
        self.depths[id.0].load(Ordering::Relaxed)
    }

    /// Refresh every depth snapshot from `state`. Call with the gate held.
    pub(crate) fn publish(&self, state: &S) {
        for (binding, depth) in self.bindings.iter().zip(self.depths.iter()) {
            depth.store((binding.depth)(state), Ordering::Relaxed);
        }
    }

    pub(crate) fn infos(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.bindings.iter().map(|b| &b.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passthrough::{Passthrough, RX, TX};

    fn dup_bindings() -> Vec<ChannelBinding<Passthrough>> {
        let mut bindings = Passthrough::bindings();
        bindings.push(ChannelBinding::new(
            TX,
            "bytes::Bytes",
            |_, v| Err(v),
            |_| None,
            |_| 0,
        ));
        bindings
    }

    #[test]
    fn resolves_declared_names() {
        let table = ChannelTable::new(Passthrough::bindings()).unwrap();
        let rx = table.resolve(RX).unwrap();
        let tx = table.resolve(TX).unwrap();
        assert_ne!(rx, tx);
        assert_eq!(table.binding(tx).info().name, TX);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let table = ChannelTable::new(Passthrough::bindings()).unwrap();
        let err = table.resolve("telemetry").unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(name) if name == "telemetry"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ChannelTable::new(dup_bindings()).err().unwrap();
        assert!(matches!(err, ChannelError::DuplicateChannel(name) if name == TX));
    }

    #[test]
    fn depth_reflects_last_publish() {
        let table = ChannelTable::new(Passthrough::bindings()).unwrap();
        let tx = table.resolve(TX).unwrap();
        let mut state = Passthrough::new(4, 4, 64);

        state.decode(b"ignored by tx");
        let _ = (table.binding(tx).enqueue)(&mut state, bytes::Bytes::from_static(b"a"));
        assert_eq!(table.depth(tx), 0);

        table.publish(&state);
        assert_eq!(table.depth(tx), 1);
        assert_eq!(table.depth(table.resolve(RX).unwrap()), 1);
    }

    #[test]
    fn infos_preserve_declaration_order() {
        let table = ChannelTable::new(Passthrough::bindings()).unwrap();
        let names: Vec<_> = table.infos().map(|i| i.name).collect();
        assert_eq!(names, vec![RX, TX]);
    }
}
