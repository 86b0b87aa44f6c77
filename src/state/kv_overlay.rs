//! Per-store overlay of pending key/value modifications.

use crate::types::teal::{TealValue, ValueDelta};
use std::collections::BTreeMap;

/// Overlay of writes and deletes for a single key/value store.
///
/// The overlay has no access to the store it shadows; callers supply the
/// backing value on every write so that a write equal to the backing value
/// produces no delta. The invariant maintained here is that a key is present
/// in the delta iff its effective value differs from the backing store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct KvOverlay {
    delta: BTreeMap<String, ValueDelta>,
}

impl KvOverlay {
    /// Reads a key from the overlay.
    ///
    /// Returns `None` when the overlay has no entry for the key, in which
    /// case the caller must consult the backing store. `Some(None)` means the
    /// key was deleted in this overlay.
    pub fn read(&self, key: &str) -> Option<Option<TealValue>> {
        self.delta.get(key).map(ValueDelta::to_teal_value)
    }

    /// Records a write, suppressing it if it matches the backing value.
    ///
    /// `base` is the value the backing store holds for this key, or `None`
    /// if the store has no entry for it.
    pub fn write(&mut self, key: &str, value: TealValue, base: Option<&TealValue>) {
        if base == Some(&value) {
            self.delta.remove(key);
        } else {
            self.delta.insert(key.to_string(), value.to_value_delta());
        }
    }

    /// Records a delete, suppressing it if the backing store has no entry.
    pub fn del(&mut self, key: &str, base_present: bool) {
        if base_present {
            self.delta.insert(key.to_string(), ValueDelta::Delete);
        } else {
            self.delta.remove(key);
        }
    }

    /// Drops every pending modification.
    ///
    /// Used on opt-in, opt-out, and app-create events, which wipe the store.
    pub fn clear(&mut self) {
        self.delta.clear();
    }

    /// Returns true if no modifications are pending.
    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    /// Iterates over the pending modifications in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueDelta)> {
        self.delta.iter()
    }
}

impl IntoIterator for KvOverlay {
    type Item = (String, ValueDelta);
    type IntoIter = std::collections::btree_map::IntoIter<String, ValueDelta>;

    fn into_iter(self) -> Self::IntoIter {
        self.delta.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_misses_without_entry() {
        let overlay = KvOverlay::default();
        assert_eq!(overlay.read("k"), None);
    }

    #[test]
    fn write_then_read_hits() {
        let mut overlay = KvOverlay::default();
        overlay.write("k", TealValue::Uint(3), None);
        assert_eq!(overlay.read("k"), Some(Some(TealValue::Uint(3))));
    }

    #[test]
    fn write_matching_base_is_suppressed() {
        let mut overlay = KvOverlay::default();
        let base = TealValue::Uint(5);
        overlay.write("k", TealValue::Uint(5), Some(&base));
        assert!(overlay.is_empty());
    }

    #[test]
    fn write_matching_base_removes_prior_delta() {
        let mut overlay = KvOverlay::default();
        let base = TealValue::Uint(5);
        overlay.write("k", TealValue::Uint(9), Some(&base));
        assert_eq!(overlay.read("k"), Some(Some(TealValue::Uint(9))));

        // Writing the backing value again cancels the earlier write.
        overlay.write("k", TealValue::Uint(5), Some(&base));
        assert!(overlay.is_empty());
    }

    #[test]
    fn write_differing_from_base_is_recorded() {
        let mut overlay = KvOverlay::default();
        let base = TealValue::from_bytes("old");
        overlay.write("k", TealValue::from_bytes("new"), Some(&base));
        assert_eq!(overlay.read("k"), Some(Some(TealValue::from_bytes("new"))));
    }

    #[test]
    fn del_of_present_key_records_delete() {
        let mut overlay = KvOverlay::default();
        overlay.del("k", true);
        assert_eq!(overlay.read("k"), Some(None));
    }

    #[test]
    fn del_of_absent_key_is_suppressed() {
        let mut overlay = KvOverlay::default();
        overlay.del("k", false);
        assert!(overlay.is_empty());
    }

    #[test]
    fn del_of_absent_key_cancels_prior_write() {
        let mut overlay = KvOverlay::default();
        overlay.write("k", TealValue::Uint(1), None);
        overlay.del("k", false);
        assert!(overlay.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut overlay = KvOverlay::default();
        overlay.write("a", TealValue::Uint(1), None);
        overlay.del("b", true);
        overlay.clear();
        assert!(overlay.is_empty());
    }
}
