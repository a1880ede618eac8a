use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::report::LoadedReport;

pub const SESSION_COOKIE: &str = "bni_session";

/// Loaded report per browser session, least recently used evicted first
pub struct SessionStore {
    capacity: usize,
    inner: Mutex<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    reports: HashMap<Uuid, Arc<LoadedReport>>,
    recency: VecDeque<Uuid>,
}

impl SessionInner {
    fn touch(&mut self, id: Uuid) {
        self.recency.retain(|other| *other != id);
        self.recency.push_back(id);
    }
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<LoadedReport>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let report = inner.reports.get(id).cloned()?;
        inner.touch(*id);
        Some(report)
    }

    /// Replace the session's report, evicting the stalest sessions over capacity
    pub fn set(&self, id: Uuid, report: Arc<LoadedReport>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.reports.insert(id, report);
        inner.touch(id);
        while inner.recency.len() > self.capacity {
            if let Some(stale) = inner.recency.pop_front() {
                inner.reports.remove(&stale);
            }
        }
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.recency.retain(|other| other != id);
        inner.reports.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reports
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::{MemberTable, ReportFormat};

    fn report(name: &str) -> Arc<LoadedReport> {
        Arc::new(LoadedReport {
            file_name: name.to_string(),
            format: ReportFormat::Pagisto,
            table: MemberTable::new(vec![], vec![]),
            notices: vec![],
            loaded_at: chrono::Local::now(),
        })
    }

    #[test]
    fn test_least_recently_used_session_is_evicted() {
        let store = SessionStore::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.set(a, report("a"));
        store.set(b, report("b"));
        // reading `a` makes `b` the stalest
        assert!(store.get(&a).is_some());
        store.set(c, report("c"));

        assert_eq!(store.len(), 2);
        assert!(store.get(&b).is_none());
        assert_eq!(store.get(&a).unwrap().file_name, "a");
    }

    #[test]
    fn test_upload_replaces_and_reset_removes() {
        let store = SessionStore::new(4);
        let id = Uuid::new_v4();
        store.set(id, report("first"));
        store.set(id, report("second"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().file_name, "second");

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(store.get(&id).is_none());
    }
}
