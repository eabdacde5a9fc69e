use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use parking_lot::RwLock;

use super::session::{SessionKeys, SessionStore};
use super::storage::{FileStorage, MemoryStorage, Storage, StorageError};
use crate::tprintln;

/// Per-client session stores keyed by the client cookie id.
/// With a storage directory each client is backed by `<dir>/<client_id>.json`.
pub struct ClientVault {
    keys: SessionKeys,
    dir: Option<PathBuf>,
    stores: RwLock<HashMap<String, Arc<SessionStore>>>,
}

pub fn new_client_id() -> String {
    // 256-bit random id, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Client ids double as file names, so only base64url characters are accepted.
pub fn is_valid_client_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

// Client ids act as bearer secrets; traces only carry a short prefix.
fn id_prefix(client_id: &str) -> &str {
    &client_id[..client_id.len().min(6)]
}

impl ClientVault {
    pub fn new(keys: SessionKeys, dir: Option<PathBuf>) -> Self {
        Self { keys, dir, stores: RwLock::new(HashMap::new()) }
    }

    pub fn in_memory() -> Self { Self::new(SessionKeys::default(), None) }

    fn document_path(&self, client_id: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{}.json", client_id)))
    }

    /// Store for a known client. Clients never seen by this process are restored from disk
    /// when a document exists for them.
    pub fn get(&self, client_id: &str) -> Option<Arc<SessionStore>> {
        if !is_valid_client_id(client_id) { return None; }
        if let Some(s) = self.stores.read().get(client_id) { return Some(s.clone()); }
        let path = self.document_path(client_id)?;
        if !path.exists() { return None; }
        Some(self.insert(client_id, Arc::new(FileStorage::open(path))))
    }

    pub fn get_or_create(&self, client_id: &str) -> Option<Arc<SessionStore>> {
        if let Some(s) = self.get(client_id) { return Some(s); }
        if !is_valid_client_id(client_id) { return None; }
        let storage: Arc<dyn Storage> = match self.document_path(client_id) {
            Some(path) => Arc::new(FileStorage::open(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        Some(self.insert(client_id, storage))
    }

    fn insert(&self, client_id: &str, storage: Arc<dyn Storage>) -> Arc<SessionStore> {
        let mut m = self.stores.write();
        m.entry(client_id.to_string())
            .or_insert_with(|| {
                tprintln!("vault.open client={}..", id_prefix(client_id));
                Arc::new(SessionStore::new(storage, self.keys.clone()))
            })
            .clone()
    }

    /// Forget a client and delete its document. Unknown clients are a no-op.
    pub fn remove(&self, client_id: &str) -> Result<(), StorageError> {
        if !is_valid_client_id(client_id) { return Ok(()); }
        let removed = self.stores.write().remove(client_id);
        if let Some(path) = self.document_path(client_id) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
        if removed.is_some() { tprintln!("vault.close client={}..", id_prefix(client_id)); }
        Ok(())
    }

    pub fn len(&self) -> usize { self.stores.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
