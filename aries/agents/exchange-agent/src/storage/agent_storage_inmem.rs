use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use super::AgentStorage;
use crate::error::*;

struct Entry<T> {
    seq: u64,
    record: Mutex<T>,
}

pub struct AgentStorageInMem<T>
where
    T: Clone,
{
    pub name: String,
    store: RwLock<HashMap<String, Entry<T>>>,
    next_seq: AtomicU64,
}

impl<T> std::fmt::Debug for AgentStorageInMem<T>
where
    T: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentStorageInMem")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> AgentStorageInMem<T>
where
    T: Clone,
{
    pub fn new(name: &str) -> Self {
        Self {
            store: Default::default(),
            name: name.to_string(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn lock_store_read(&self) -> AgentResult<RwLockReadGuard<'_, HashMap<String, Entry<T>>>> {
        match self.store.read() {
            Ok(g) => Ok(g),
            Err(e) => {
                error!("Unable to read-lock Object Store: {:?}", e);
                Err(AgentError::from_msg(
                    AgentErrorKind::LockError,
                    &format!(
                        "[AgentStorageInMem: {}] Unable to lock Object Store: {:?}",
                        self.name, e
                    ),
                ))
            }
        }
    }

    fn lock_store_write(&self) -> AgentResult<RwLockWriteGuard<'_, HashMap<String, Entry<T>>>> {
        match self.store.write() {
            Ok(g) => Ok(g),
            Err(e) => {
                error!("Unable to write-lock Object Store: {:?}", e);
                Err(AgentError::from_msg(
                    AgentErrorKind::LockError,
                    &format!(
                        "[AgentStorageInMem: {}] Unable to lock Object Store: {:?}",
                        self.name, e
                    ),
                ))
            }
        }
    }

    fn lock_error(&self) -> AgentError {
        AgentError::from_msg(
            AgentErrorKind::LockError,
            &format!("[AgentStorageInMem: {}] Unable to lock record", self.name),
        )
    }

    fn sorted_records<F>(&self, mut predicate: F) -> AgentResult<Vec<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let store = self.lock_store_read()?;
        let mut matching = Vec::new();
        for entry in store.values() {
            let record = entry.record.lock().map_err(|_| self.lock_error())?;
            if predicate(&record) {
                matching.push((entry.seq, record.clone()));
            }
        }
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, record)| record).collect())
    }
}

impl<T> AgentStorage<T> for AgentStorageInMem<T>
where
    T: Clone,
{
    fn get(&self, id: &str) -> AgentResult<T> {
        let store = self.lock_store_read()?;
        match store.get(id) {
            Some(entry) => match entry.record.lock() {
                Ok(record) => Ok(record.clone()),
                Err(_) => Err(self.lock_error()),
            },
            None => Err(AgentError::from_msg(
                AgentErrorKind::NotFound,
                &format!("[AgentStorageInMem: {}] Object not found for id: {}", self.name, id),
            )),
        }
    }

    fn insert(&self, id: &str, obj: T) -> AgentResult<String> {
        let mut store = self.lock_store_write()?;
        match store.get_mut(id) {
            Some(entry) => {
                let record = entry.record.get_mut().map_err(|_| self.lock_error())?;
                *record = obj;
            }
            None => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                store.insert(
                    id.to_string(),
                    Entry {
                        seq,
                        record: Mutex::new(obj),
                    },
                );
            }
        }
        Ok(id.to_string())
    }

    fn contains_key(&self, id: &str) -> bool {
        let store = match self.lock_store_read() {
            Ok(g) => g,
            Err(_) => return false,
        };
        store.contains_key(id)
    }

    fn list_all(&self) -> AgentResult<Vec<T>> {
        self.sorted_records(|_| true)
    }

    fn find_by<F>(&self, predicate: F) -> AgentResult<Vec<T>>
    where
        F: FnMut(&T) -> bool,
    {
        self.sorted_records(predicate)
    }

    fn update<F, R>(&self, id: &str, f: F) -> AgentResult<R>
    where
        F: FnOnce(&T) -> AgentResult<(T, R)>,
    {
        let store = self.lock_store_read()?;
        let entry = store.get(id).ok_or_else(|| {
            AgentError::from_msg(
                AgentErrorKind::NotFound,
                &format!("[AgentStorageInMem: {}] Object not found for id: {}", self.name, id),
            )
        })?;
        let mut record = entry.record.lock().map_err(|_| self.lock_error())?;
        let (updated, output) = f(&record)?;
        *record = updated;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_list_all_keeps_insertion_order() {
        let storage = AgentStorageInMem::new("test");
        for id in ["c", "a", "b"] {
            storage.insert(id, id.to_uppercase()).unwrap();
        }
        storage.insert("a", "A2".to_string()).unwrap();

        assert_eq!(storage.list_all().unwrap(), vec!["C", "A2", "B"]);
        assert_eq!(
            storage.find_by(|value| value.starts_with('A') || value == "B").unwrap(),
            vec!["A2", "B"]
        );
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let storage = AgentStorageInMem::<String>::new("test");

        let err = storage.get("missing").unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::NotFound);
        assert!(!storage.contains_key("missing"));
    }

    #[test]
    fn test_failed_update_keeps_value() {
        let storage = AgentStorageInMem::new("test");
        storage.insert("id", 1u32).unwrap();

        let err = storage
            .update("id", |_| -> AgentResult<(u32, ())> {
                Err(AgentError::from_kind(AgentErrorKind::ProtocolStateError))
            })
            .unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
        assert_eq!(storage.get("id").unwrap(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_serialized_per_id() {
        let storage = Arc::new(AgentStorageInMem::new("test"));
        storage.insert("offer", "offer-received".to_string()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = storage.clone();
                thread::spawn(move || {
                    storage.update("offer", |state: &String| {
                        if state == "offer-received" {
                            Ok(("request-sent".to_string(), ()))
                        } else {
                            Err(AgentError::from_kind(AgentErrorKind::ProtocolStateError))
                        }
                    })
                })
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(storage.get("offer").unwrap(), "request-sent");
    }
}
