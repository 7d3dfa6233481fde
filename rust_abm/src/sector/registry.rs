use std::collections::HashMap;

use crate::agents::{Firm, FirmId};

/// Live, insertion-ordered firm population of one sector plus an
/// identifier index.
///
/// Iteration order is insertion order; tie-breaking in the lifecycle
/// manager depends on it. Appending keeps the index current; removals
/// leave it stale until [`FirmRegistry::rebuild_index`] runs.
#[derive(Clone, Debug)]
pub struct FirmRegistry<F> {
    firms: Vec<F>,
    index: HashMap<FirmId, usize>,
    next_id: u64,
    stale: bool,
}

impl<F> Default for FirmRegistry<F> {
    fn default() -> Self {
        FirmRegistry {
            firms: Vec::new(),
            index: HashMap::new(),
            next_id: 0,
            stale: false,
        }
    }
}

impl<F: Firm> FirmRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        FirmRegistry {
            firms: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
            next_id: 0,
            stale: false,
        }
    }

    /// Reserve a fresh identifier; never reused within the sector.
    pub fn next_id(&mut self) -> FirmId {
        let id = FirmId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn push(&mut self, firm: F) {
        let id = firm.id();
        self.next_id = self.next_id.max(id.0 + 1);
        if !self.stale {
            self.index.insert(id, self.firms.len());
        }
        self.firms.push(firm);
    }

    /// Remove every firm whose flag in `marked` is set, preserving the
    /// order of survivors. Returns the removed firms in their original order.
    pub fn remove_marked(&mut self, marked: &[bool]) -> Vec<F> {
        debug_assert_eq!(marked.len(), self.firms.len());
        let mut removed = Vec::new();
        let firms = std::mem::take(&mut self.firms);
        for (firm, &quit) in firms.into_iter().zip(marked) {
            if quit {
                removed.push(firm);
            } else {
                self.firms.push(firm);
            }
        }
        if !removed.is_empty() {
            self.stale = true;
        }
        removed
    }

    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, firm) in self.firms.iter().enumerate() {
            self.index.insert(firm.id(), pos);
        }
        self.stale = false;
    }

    pub fn position(&self, id: FirmId) -> Option<usize> {
        debug_assert!(!self.stale, "firm index read before rebuild");
        self.index.get(&id).copied()
    }

    pub fn get(&self, id: FirmId) -> Option<&F> {
        self.position(id).and_then(|pos| self.firms.get(pos))
    }

    pub fn get_mut(&mut self, id: FirmId) -> Option<&mut F> {
        let pos = self.position(id)?;
        self.firms.get_mut(pos)
    }

    pub fn len(&self) -> usize {
        self.firms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.firms.is_empty()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, F> {
        self.firms.iter_mut()
    }

    pub fn as_slice(&self) -> &[F] {
        &self.firms
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.firms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ConsumptionFirm, FirmCore};

    fn firm(id: u64) -> ConsumptionFirm {
        ConsumptionFirm::new(
            FirmCore::new(FirmId(id), 0, 0.25, 1.0, 10.0, 10.0, 1.0, 0.1),
            4,
        )
    }

    #[test]
    fn lookup_survives_removal_after_rebuild() {
        let mut reg = FirmRegistry::new();
        for id in 0..4 {
            reg.push(firm(id));
        }
        let removed = reg.remove_marked(&[false, true, false, true]);
        assert_eq!(removed.iter().map(|f| f.id()).collect::<Vec<_>>(), vec![FirmId(1), FirmId(3)]);

        reg.rebuild_index();
        assert_eq!(reg.position(FirmId(2)), Some(1));
        assert!(reg.get(FirmId(1)).is_none());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut reg = FirmRegistry::new();
        reg.push(firm(5));
        assert_eq!(reg.next_id(), FirmId(6));
        assert_eq!(reg.next_id(), FirmId(7));
    }
}
