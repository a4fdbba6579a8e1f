//! Cache API Implementation
//!
//! Named caches of request/response pairs. Caches persist across worker
//! versions until explicitly deleted; entries persist until overwritten or
//! the whole cache is deleted.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::fetch::{NetworkFetch, Request, Response};

/// Cache error types
#[derive(Debug, Clone)]
pub enum CacheError {
    /// A precache asset could not be fetched; the cache was left untouched.
    AssetFetchFailed(String),
    /// Backing store failure.
    StorageError(String),
}

/// A cached request-response pair
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The request
    request: Request,
    /// The response
    response: Response,
    /// Size in bytes
    size: usize,
}

impl CacheEntry {
    fn new(request: Request, response: Response) -> Self {
        let size = response.body.as_ref().map(|b| b.len()).unwrap_or(0);
        Self {
            request,
            response,
            size,
        }
    }
}

/// A named cache of request/response pairs
#[derive(Debug)]
pub struct Cache {
    /// Cache name
    name: String,
    /// Cached entries (method:URL -> entry)
    entries: BTreeMap<String, CacheEntry>,
    /// Total size in bytes
    total_size: usize,
}

impl Cache {
    /// Create a new cache
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            total_size: 0,
        }
    }

    /// Get cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match a request
    pub fn match_request(&self, request: &Request) -> Option<Response> {
        self.entries
            .get(&make_key(request))
            .map(|e| e.response.clone())
    }

    /// Add a request/response pair, replacing any prior entry
    pub fn put(&mut self, request: Request, response: Response) {
        let key = make_key(&request);
        let entry = CacheEntry::new(request, response);
        let size = entry.size;

        if let Some(old) = self.entries.remove(&key) {
            self.total_size -= old.size;
        }

        self.entries.insert(key, entry);
        self.total_size += size;
    }

    /// Fetch every URL and store the results.
    ///
    /// All-or-nothing: responses are collected first and only stored once
    /// every fetch has resolved with an OK status. On failure the cache
    /// contents are unchanged.
    pub fn add_all(
        &mut self,
        urls: &[String],
        net: &dyn NetworkFetch,
    ) -> Result<(), CacheError> {
        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            let request = Request::new(url.clone());
            let response = net
                .fetch(&request)
                .map_err(|_| CacheError::AssetFetchFailed(url.clone()))?;
            if !response.ok() {
                return Err(CacheError::AssetFetchFailed(url.clone()));
            }
            fetched.push((request, response));
        }

        for (request, response) in fetched {
            self.put(request, response);
        }
        Ok(())
    }

    /// Get all cached requests
    pub fn keys(&self) -> Vec<Request> {
        self.entries.values().map(|e| e.request.clone()).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get total size in bytes
    pub fn size(&self) -> usize {
        self.total_size
    }
}

/// Make a cache key from a request
fn make_key(request: &Request) -> String {
    format!("{}:{}", request.method.as_str(), request.url)
}

/// Cache storage (manages the named caches of one origin)
#[derive(Debug)]
pub struct CacheStorage {
    /// Caches by name
    caches: BTreeMap<String, Cache>,
}

impl CacheStorage {
    /// Create new cache storage
    pub const fn new() -> Self {
        Self {
            caches: BTreeMap::new(),
        }
    }

    /// Open or create a cache
    pub fn open(&mut self, name: &str) -> &mut Cache {
        if !self.caches.contains_key(name) {
            self.caches.insert(name.to_string(), Cache::new(name));
        }
        self.caches.get_mut(name).unwrap()
    }

    /// Check if a cache exists
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Get a cache by name
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Delete a cache. Returns whether a cache was removed.
    pub fn delete(&mut self, name: &str) -> Result<bool, CacheError> {
        Ok(self.caches.remove(name).is_some())
    }

    /// Get all cache names
    pub fn keys(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Match a request across all caches
    pub fn match_request(&self, request: &Request) -> Option<Response> {
        for cache in self.caches.values() {
            if let Some(response) = cache.match_request(request) {
                return Some(response);
            }
        }
        None
    }

    /// Total bytes stored across all caches
    pub fn usage(&self) -> usize {
        self.caches.values().map(|c| c.size()).sum()
    }
}

impl Default for CacheStorage {
    fn default() -> Self {
        Self::new()
    }
}
