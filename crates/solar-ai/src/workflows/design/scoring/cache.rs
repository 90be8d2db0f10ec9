use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::super::catalog::{electrical_fingerprint, InverterRecord, PanelRecord};
use super::{CompatibilityMatrixEntry, CompatibilityScorer};

/// Matrix-entry cache keyed by pair identity plus the electrical attribute
/// fingerprint. An equipment revision changes the fingerprint, so the stale
/// entry is superseded on the next lookup instead of being served.
#[derive(Default)]
pub struct CompatibilityCache {
    entries: Mutex<HashMap<(String, String, u64), Arc<CompatibilityMatrixEntry>>>,
}

impl CompatibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(
        &self,
        scorer: &CompatibilityScorer,
        panel: &PanelRecord,
        inverter: &InverterRecord,
    ) -> Arc<CompatibilityMatrixEntry> {
        let key = (
            panel.id.clone(),
            inverter.id.clone(),
            electrical_fingerprint(panel, inverter),
        );

        let mut guard = self.entries.lock().expect("compatibility cache poisoned");
        if let Some(entry) = guard.get(&key) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(scorer.score(panel, inverter));
        // Any earlier entry for this pair was computed against a different
        // fingerprint; drop it so the map does not accumulate superseded keys.
        guard.retain(|(panel_id, inverter_id, _), _| {
            panel_id != &key.0 || inverter_id != &key.1
        });
        guard.insert(key, Arc::clone(&entry));
        entry
    }

    /// Drops every cached entry touching the given equipment id.
    pub fn invalidate_equipment(&self, equipment_id: &str) {
        let mut guard = self.entries.lock().expect("compatibility cache poisoned");
        guard.retain(|(panel_id, inverter_id, _), _| {
            panel_id != equipment_id && inverter_id != equipment_id
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("compatibility cache poisoned").len()
    }
}
