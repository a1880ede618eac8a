use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use crate::domain::report::LoadedReport;

/// Content-addressed cache of parsed uploads, oldest entry evicted first
pub struct LoadCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<LoadedReport>>,
    order: VecDeque<String>,
}

impl LoadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Key over the lowercased extension and the raw bytes; the
    /// extension picks the parser, so it is part of the identity.
    pub fn key_for(file_name: &str, bytes: &[u8]) -> String {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(extension.as_bytes());
        hasher.update([0u8]);
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<Arc<LoadedReport>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, report: Arc<LoadedReport>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.insert(key.clone(), report).is_none() {
            inner.order.push_back(key);
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::{MemberTable, ReportFormat};

    fn report(name: &str) -> Arc<LoadedReport> {
        Arc::new(LoadedReport {
            file_name: name.to_string(),
            format: ReportFormat::Palms,
            table: MemberTable::new(vec![], vec![]),
            notices: vec![],
            loaded_at: chrono::Local::now(),
        })
    }

    #[test]
    fn test_key_depends_on_extension_and_content() {
        let a = LoadCache::key_for("a.csv", b"x,y");
        assert_eq!(a, LoadCache::key_for("other-name.CSV", b"x,y"));
        assert_ne!(a, LoadCache::key_for("a.xlsx", b"x,y"));
        assert_ne!(a, LoadCache::key_for("a.csv", b"x;y"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let cache = LoadCache::new(2);
        cache.insert("k1".into(), report("1"));
        cache.insert("k2".into(), report("2"));
        cache.insert("k3".into(), report("3"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("k1").is_none());
        assert_eq!(cache.get("k3").unwrap().file_name, "3");
    }
}
