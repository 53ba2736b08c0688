use std::collections::BTreeMap;
use std::fmt;

use crate::CancelHandle;

/// Identifies one request issued by one client. Never reused by that client.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outstanding requests of one client, keyed by id.
///
/// Ids are pre-incremented, so the first one is `1`.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    last_id: u64,
    entries: BTreeMap<RequestId, CancelHandle>,
}

impl Registry {
    pub(crate) fn next_id(&mut self) -> RequestId {
        self.last_id += 1;
        RequestId(self.last_id)
    }

    pub(crate) fn insert(&mut self, id: RequestId, handle: CancelHandle) {
        self.entries.insert(id, handle);
    }

    pub(crate) fn remove(&mut self, id: RequestId) -> Option<CancelHandle> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: RequestId) -> Option<&CancelHandle> {
        self.entries.get(&id)
    }

    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn ids(&self) -> Vec<RequestId> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn handles(&self) -> Vec<CancelHandle> {
        self.entries.values().cloned().collect()
    }
}
