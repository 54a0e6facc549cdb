use gpudeck_common::SyncReport;
use std::collections::HashMap;

/// Progress of the standby sync for one machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing { force: bool },
    Synced(SyncReport),
    Failed(String),
}

impl SyncState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SyncState::Syncing { .. })
    }

    pub fn label(&self) -> String {
        match self {
            SyncState::Idle => "idle".to_string(),
            SyncState::Syncing { force: true } => "full sync…".to_string(),
            SyncState::Syncing { force: false } => "syncing…".to_string(),
            SyncState::Synced(r) => format!(
                "synced {} file(s), {}",
                r.files_changed,
                human_bytes(r.bytes_transferred)
            ),
            SyncState::Failed(msg) => format!("sync failed: {}", msg),
        }
    }
}

/// Per-machine sync states.
#[derive(Debug, Default, Clone)]
pub struct SyncTracker {
    states: HashMap<i64, SyncState>,
}

impl SyncTracker {
    pub fn get(&self, id: i64) -> SyncState {
        self.states.get(&id).cloned().unwrap_or_default()
    }

    /// Mark a sync as started. False if one is already running.
    pub fn begin(&mut self, id: i64, force: bool) -> bool {
        if self.get(id).is_busy() {
            return false;
        }
        self.states.insert(id, SyncState::Syncing { force });
        true
    }

    pub fn finish(&mut self, id: i64, result: Result<SyncReport, String>) {
        let state = match result {
            Ok(report) => SyncState::Synced(report),
            Err(msg) => SyncState::Failed(msg),
        };
        self.states.insert(id, state);
    }

    /// Drop entries for machines that no longer exist.
    pub fn retain_ids(&mut self, live: &[i64]) {
        self.states.retain(|id, _| live.contains(id));
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_while_busy() {
        let mut t = SyncTracker::default();
        assert!(t.begin(1, false));
        assert!(!t.begin(1, true));
        t.finish(1, Err("timeout".into()));
        assert_eq!(t.get(1), SyncState::Failed("timeout".into()));
        assert!(t.begin(1, true));
    }

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1536), "1.5 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn retain_drops_deleted_machines() {
        let mut t = SyncTracker::default();
        t.begin(1, false);
        t.begin(2, false);
        t.retain_ids(&[2]);
        assert_eq!(t.get(1), SyncState::Idle);
        assert!(t.get(2).is_busy());
    }
}
