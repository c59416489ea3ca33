// src/store.rs
//! Review queue and audit trail behind a narrow record-store interface.
//!
//! The pipeline only sees [`ReviewStore`]. Two backends ship with the crate:
//! a JSON file (tmp + rename on every write) and an in-memory store for tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A manually curated item waiting for inclusion in an edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualInsert {
    pub id: String,
    pub track: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub source_links: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    pub status: InsertStatus,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<String>,
}

impl AuditEvent {
    pub fn new(entity_type: &str, entity_id: &str, event: &str, payload: serde_json::Value) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event: event.to_string(),
            payload,
            created_at: Utc::now(),
            user: None,
        }
    }
}

pub trait ReviewStore: Send + Sync {
    /// Pending inserts for `track`, highest priority first, then oldest first.
    fn fetch_pending(&self, track: &str) -> Result<Vec<ManualInsert>>;
    /// Set `status` on the given record ids. Returns how many records changed.
    fn mark_selected(&self, ids: &[String], status: InsertStatus) -> Result<usize>;
    fn append_audit(&self, event: AuditEvent) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    inserts: Vec<ManualInsert>,
    #[serde(default)]
    audit: Vec<AuditEvent>,
}

impl StoreState {
    fn pending(&self, track: &str) -> Vec<ManualInsert> {
        let mut v: Vec<ManualInsert> = self
            .inserts
            .iter()
            .filter(|r| r.status == InsertStatus::Pending && r.track == track)
            .cloned()
            .collect();
        v.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        v
    }

    fn mark(&mut self, ids: &[String], status: InsertStatus) -> usize {
        let now = Utc::now();
        let mut changed = 0;
        for r in self.inserts.iter_mut().filter(|r| ids.contains(&r.id)) {
            r.status = status;
            r.decided_at = Some(now);
            changed += 1;
        }
        changed
    }
}

/// JSON-file backed store. The whole state is rewritten on each mutation.
pub struct JsonFileReviewStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileReviewStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Add a record to the queue (used by the review tooling and tests).
    pub fn insert(&self, record: ManualInsert) -> Result<()> {
        let _g = self.lock.lock().expect("store mutex poisoned");
        let mut state = self.load()?;
        state.inserts.retain(|r| r.id != record.id);
        state.inserts.push(record);
        self.save(&state)
    }

    pub fn audit_events(&self) -> Result<Vec<AuditEvent>> {
        let _g = self.lock.lock().expect("store mutex poisoned");
        Ok(self.load()?.audit)
    }

    fn load(&self) -> Result<StoreState> {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing review store {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
            Err(e) => {
                Err(e).with_context(|| format!("reading review store {}", self.path.display()))
            }
        }
    }

    fn save(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        write_atomic(&self.path, &serde_json::to_vec_pretty(state)?)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path).with_context(|| format!("renaming onto {}", path.display()))?;
    Ok(())
}

impl ReviewStore for JsonFileReviewStore {
    fn fetch_pending(&self, track: &str) -> Result<Vec<ManualInsert>> {
        let _g = self.lock.lock().expect("store mutex poisoned");
        Ok(self.load()?.pending(track))
    }

    fn mark_selected(&self, ids: &[String], status: InsertStatus) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _g = self.lock.lock().expect("store mutex poisoned");
        let mut state = self.load()?;
        let changed = state.mark(ids, status);
        if changed > 0 {
            self.save(&state)?;
        }
        tracing::info!(target: "store", count = changed, status = ?status, "manual inserts marked");
        Ok(changed)
    }

    fn append_audit(&self, event: AuditEvent) -> Result<()> {
        let _g = self.lock.lock().expect("store mutex poisoned");
        let mut state = self.load()?;
        state.audit.push(event);
        self.save(&state)
    }
}

#[derive(Default)]
pub struct InMemoryReviewStore {
    state: Mutex<StoreState>,
}

impl InMemoryReviewStore {
    pub fn with_inserts(inserts: Vec<ManualInsert>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                inserts,
                audit: Vec::new(),
            }),
        }
    }

    pub fn snapshot(&self) -> (Vec<ManualInsert>, Vec<AuditEvent>) {
        let s = self.state.lock().expect("store mutex poisoned");
        (s.inserts.clone(), s.audit.clone())
    }
}

impl ReviewStore for InMemoryReviewStore {
    fn fetch_pending(&self, track: &str) -> Result<Vec<ManualInsert>> {
        Ok(self.state.lock().expect("store mutex poisoned").pending(track))
    }

    fn mark_selected(&self, ids: &[String], status: InsertStatus) -> Result<usize> {
        Ok(self.state.lock().expect("store mutex poisoned").mark(ids, status))
    }

    fn append_audit(&self, event: AuditEvent) -> Result<()> {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .audit
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, priority: i32, day: u32) -> ManualInsert {
        ManualInsert {
            id: id.into(),
            track: "news".into(),
            title: format!("title {id}"),
            summary: "summary".into(),
            source_links: vec!["https://example.org".into()],
            priority,
            status: InsertStatus::Pending,
            submitted_by: "editor".into(),
            created_at: Utc.with_ymd_and_hms(2025, 9, day, 9, 0, 0).unwrap(),
            decided_at: None,
        }
    }

    #[test]
    fn pending_sorted_by_priority_then_age() {
        let store = InMemoryReviewStore::with_inserts(vec![
            record("a", 0, 3),
            record("b", 5, 4),
            record("c", 0, 1),
        ]);
        let ids: Vec<_> = store
            .fetch_pending("news")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(store.fetch_pending("blog").unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trips_marks_and_audit() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileReviewStore::new(dir.path().join("state/review.json"));
        assert!(store.fetch_pending("news").unwrap().is_empty());

        store.insert(record("a", 1, 2)).unwrap();
        store.insert(record("b", 0, 2)).unwrap();
        assert_eq!(store.fetch_pending("news").unwrap().len(), 2);

        let changed = store
            .mark_selected(&["a".to_string()], InsertStatus::Accepted)
            .unwrap();
        assert_eq!(changed, 1);
        let pending = store.fetch_pending("news").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");

        store
            .append_audit(AuditEvent::new("manual_insert", "a", "accepted", serde_json::json!({})))
            .unwrap();
        assert_eq!(store.audit_events().unwrap().len(), 1);
    }
}
