//! Shared session and global variable stores.
//!
//! Session stores are created lazily and cached process-wide by session id;
//! there is exactly one global store. Both may be read and written by
//! several contexts at once, including contexts running on spawned tasks.

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Identifies a family of contexts sharing one session-tier store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// A concurrently accessible name → value map.
///
/// Writing [`Value::Null`] removes the name; reading a missing name yields
/// `Null`.
#[derive(Debug, Default)]
pub struct VariableStore {
    vars: RwLock<HashMap<String, Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Value {
        self.vars.read().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut vars = self.vars.write();
        if value.is_null() {
            vars.remove(name);
        } else {
            vars.insert(name.to_string(), value);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.read().is_empty()
    }

    pub fn clear(&self) {
        self.vars.write().clear();
    }

    /// A sorted copy of the current contents.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.vars
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

static GLOBAL_STORE: Lazy<Arc<VariableStore>> = Lazy::new(|| Arc::new(VariableStore::new()));

static SESSION_STORES: Lazy<Mutex<HashMap<SessionId, Arc<VariableStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The process-wide global-tier store.
pub fn global_store() -> Arc<VariableStore> {
    Arc::clone(&GLOBAL_STORE)
}

/// The session-tier store for `session`, created on first use.
pub fn session_store(session: SessionId) -> Arc<VariableStore> {
    let mut stores = SESSION_STORES.lock();
    Arc::clone(stores.entry(session).or_default())
}

/// Forget the session-tier store for `session`. Contexts still holding it
/// keep their reference; later lookups get a fresh store. Returns whether a
/// store existed.
pub fn clear_session(session: SessionId) -> bool {
    let removed = SESSION_STORES.lock().remove(&session);
    if removed.is_some() {
        tracing::debug!(%session, "session store cleared");
    }
    removed.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_write_removes() {
        let store = VariableStore::new();
        store.set("a", Value::Int(1));
        assert!(store.contains("a"));
        store.set("a", Value::Null);
        assert!(!store.contains("a"));
        assert_eq!(store.get("a"), Value::Null);
    }

    #[test]
    fn test_session_stores_are_cached_per_id() {
        let a1 = session_store(SessionId(9_001));
        let a2 = session_store(SessionId(9_001));
        let b = session_store(SessionId(9_002));
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_clear_session_drops_store() {
        let id = SessionId(9_003);
        session_store(id).set("x", Value::Int(3));
        assert!(clear_session(id));
        assert!(!clear_session(id));
        assert_eq!(session_store(id).get("x"), Value::Null);
    }

    #[test]
    fn test_global_store_is_single() {
        assert!(Arc::ptr_eq(&global_store(), &global_store()));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = VariableStore::new();
        store.set("b", Value::Int(2));
        store.set("a", Value::Int(1));
        let keys: Vec<String> = store.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
