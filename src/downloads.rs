//! In-memory store for batch results awaiting download

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredCsv {
    pub id: Uuid,
    pub bytes: Arc<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// Keeps the most recent `capacity` results; older ones are evicted first
#[derive(Debug)]
pub struct DownloadStore {
    capacity: usize,
    entries: Mutex<VecDeque<StoredCsv>>,
}

impl DownloadStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn insert(&self, bytes: Vec<u8>) -> Uuid {
        let stored = StoredCsv {
            id: Uuid::new_v4(),
            bytes: Arc::new(bytes),
            created_at: Utc::now(),
        };
        let id = stored.id;

        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            if let Some(evicted) = entries.pop_front() {
                tracing::debug!("Evicting download {} from {}", evicted.id, evicted.created_at);
            }
        }
        entries.push_back(stored);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<StoredCsv> {
        self.entries.lock().iter().find(|e| e.id == id).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
