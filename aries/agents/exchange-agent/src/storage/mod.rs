pub mod agent_storage_inmem;

use crate::error::AgentResult;

pub trait AgentStorage<T> {
    fn get(&self, id: &str) -> AgentResult<T>;
    fn insert(&self, id: &str, obj: T) -> AgentResult<String>;
    fn contains_key(&self, id: &str) -> bool;
    fn list_all(&self) -> AgentResult<Vec<T>>;
    fn find_by<F>(&self, predicate: F) -> AgentResult<Vec<T>>
    where
        F: FnMut(&T) -> bool;
    /// Runs `f` against the current value while holding the entry lock; the returned value
    /// replaces the stored one only when `f` succeeds.
    fn update<F, R>(&self, id: &str, f: F) -> AgentResult<R>
    where
        F: FnOnce(&T) -> AgentResult<(T, R)>;
}
