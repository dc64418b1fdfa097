//! Collects [`SearchResult`]s from every worker-pool task into one
//! deduplicated, address-sorted list.

use std::sync::Mutex;

/// One located symbol: a name and the absolute address it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub name: String,
    pub address: u32,
}

impl SearchResult {
    pub fn new(name: impl Into<String>, address: u32) -> SearchResult {
        SearchResult { name: name.into(), address }
    }
}

/// A concurrent, deduplicating sink for [`SearchResult`]s, shared by
/// every task in the worker pool.
#[derive(Default)]
pub struct ResultSet {
    results: Mutex<Vec<SearchResult>>,
}

impl ResultSet {
    pub fn new() -> ResultSet {
        ResultSet { results: Mutex::new(Vec::new()) }
    }

    /// Inserts `result`, unless its address is zero or an entry already
    /// claims the same address. Returns whether it was inserted.
    pub fn add(&self, result: SearchResult) -> bool {
        if result.address == 0 {
            return false;
        }
        let mut results = self.results.lock().expect("result set mutex poisoned");
        if results.iter().any(|existing| existing.address == result.address) {
            return false;
        }
        results.push(result);
        true
    }

    /// Consumes the set, returning its contents sorted ascending by
    /// address.
    pub fn into_sorted_vec(self) -> Vec<SearchResult> {
        let mut results = self.results.into_inner().expect("result set mutex poisoned");
        results.sort_by_key(|r| r.address);
        results
    }

    pub fn len(&self) -> usize {
        self.results.lock().expect("result set mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
