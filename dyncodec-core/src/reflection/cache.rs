//! # Symbol Cache
//!
//! In-memory maps from fully qualified symbol to the path of the file declaring it, and from
//! file path to the raw descriptor bytes returned by the reflection server.
//!
//! The cache is owned by whoever creates it and handed to a [`super::client::ReflectionClient`]
//! behind an `Arc`, so it can be pre-seeded or inspected after a build. Both maps are guarded by
//! a single mutex; every read-modify-write happens under that lock.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheConflict {
    #[error("Symbol '{symbol}' is declared by both '{existing}' and '{incoming}'")]
    Symbol {
        symbol: String,
        existing: String,
        incoming: String,
    },
    #[error("File '{0}' was received twice with different contents")]
    File(String),
}

#[derive(Debug, Default)]
struct CacheMaps {
    symbols: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

/// Symbol and file cache shared with a reflection client.
#[derive(Debug, Default)]
pub struct SymbolCache {
    maps: Mutex<CacheMaps>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the file declaring `symbol`, if that file has been seen.
    pub fn path_for_symbol(&self, symbol: &str) -> Option<String> {
        self.lock().symbols.get(symbol).cloned()
    }

    /// Raw bytes of the file at `path`, exactly as received.
    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.lock().symbols.len()
    }

    /// Records a file and every symbol it declares.
    ///
    /// Inserting the same file twice is a no-op. The whole insert is rejected, leaving the cache
    /// untouched, if the file changed or if any symbol already belongs to another path.
    pub fn insert_file(
        &self,
        path: &str,
        raw: Vec<u8>,
        symbols: Vec<String>,
    ) -> Result<(), CacheConflict> {
        let mut maps = self.lock();

        if let Some(existing) = maps.files.get(path)
            && *existing != raw
        {
            return Err(CacheConflict::File(path.to_string()));
        }

        for symbol in &symbols {
            if let Some(existing) = maps.symbols.get(symbol)
                && existing != path
            {
                return Err(CacheConflict::Symbol {
                    symbol: symbol.clone(),
                    existing: existing.clone(),
                    incoming: path.to_string(),
                });
            }
        }

        maps.files.entry(path.to_string()).or_insert(raw);
        for symbol in symbols {
            maps.symbols.entry(symbol).or_insert_with(|| path.to_string());
        }

        Ok(())
    }

    // The maps hold plain data, a panic while holding the lock cannot leave them half-updated.
    fn lock(&self) -> MutexGuard<'_, CacheMaps> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
