//! Persistence collaborator: loads and saves the catalog and ledger blobs.
//!
//! The shop never waits on a save. Writes are debounced by the reducer and
//! their failures are logged; in-memory state stays authoritative.

use crate::types::{Product, SaleRecord};
use sabalitos_core::effect::EffectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Boxed future returned by [`Persistence`] methods
pub type PersistenceFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// The independently stored blobs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    /// The product list
    Catalog,
    /// The sales ledger
    Sales,
}

impl StorageKey {
    /// Every key
    pub const ALL: [Self; 2] = [Self::Catalog, Self::Sales];

    /// Short name used in file names and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Sales => "sales",
        }
    }

    /// Id of the debounced write for this key
    #[must_use]
    pub const fn effect_id(self) -> EffectId {
        match self {
            Self::Catalog => EffectId::from_static("persist:catalog"),
            Self::Sales => EffectId::from_static("persist:sales"),
        }
    }

    fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Previously saved catalog and ledger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Saved products
    pub products: Vec<Product>,
    /// Saved sale records
    pub sales: Vec<SaleRecord>,
}

/// Errors that can occur while loading or saving
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Blob could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Encodes products as a catalog blob
///
/// # Errors
///
/// Returns [`PersistenceError::Serialization`] if encoding fails.
pub fn encode_catalog(products: &[Product]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(products)?)
}

/// Encodes sale records as a sales blob
///
/// # Errors
///
/// Returns [`PersistenceError::Serialization`] if encoding fails.
pub fn encode_sales(sales: &[SaleRecord]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(sales)?)
}

fn decode_snapshot(
    catalog: Option<&str>,
    sales: Option<&str>,
) -> Result<Option<Snapshot>, PersistenceError> {
    if catalog.is_none() && sales.is_none() {
        return Ok(None);
    }

    Ok(Some(Snapshot {
        products: catalog.map(serde_json::from_str).transpose()?.unwrap_or_default(),
        sales: sales.map(serde_json::from_str).transpose()?.unwrap_or_default(),
    }))
}

/// Key-value persistence for the shop's two blobs
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the store can be shared as
/// `Arc<dyn Persistence>` and captured by effects.
pub trait Persistence: Send + Sync {
    /// Loads both blobs; `Ok(None)` means nothing was ever saved
    ///
    /// # Errors
    ///
    /// Returns an error if a blob exists but cannot be read or decoded.
    fn load(&self) -> PersistenceFuture<'_, Option<Snapshot>>;

    /// Replaces the blob stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be written.
    fn save(&self, key: StorageKey, blob: String) -> PersistenceFuture<'_, ()>;

    /// Removes both blobs
    ///
    /// # Errors
    ///
    /// Returns an error if a blob exists but cannot be removed.
    fn clear_all(&self) -> PersistenceFuture<'_, ()>;
}

/// Orders writes and clears against each other
///
/// A started write always runs to completion. Every write carries the data
/// generation it was encoded from, and `clear` raises the generation, so a
/// write still queued from before a clear is dropped instead of restoring
/// cleared data.
#[derive(Debug, Default)]
pub struct WriteGate {
    generation: tokio::sync::Mutex<u64>,
}

impl WriteGate {
    /// Creates a gate at generation 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `blob` unless a clear of a newer generation already ran
    ///
    /// Returns whether the blob was written.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the write fails.
    pub async fn save(
        &self,
        persistence: &dyn Persistence,
        generation: u64,
        key: StorageKey,
        blob: String,
    ) -> Result<bool, PersistenceError> {
        let current = self.generation.lock().await;
        if generation < *current {
            tracing::debug!(%key, generation, current = *current, "Dropping write from before a clear");
            return Ok(false);
        }
        persistence.save(key, blob).await?;
        Ok(true)
    }

    /// Removes both blobs and drops writes older than `generation`
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the blobs cannot be removed.
    pub async fn clear(
        &self,
        persistence: &dyn Persistence,
        generation: u64,
    ) -> Result<(), PersistenceError> {
        let mut current = self.generation.lock().await;
        *current = (*current).max(generation);
        persistence.clear_all().await
    }
}

/// One JSON file per key under a data directory
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir` (created on first save)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Persistence for JsonFileStore {
    fn load(&self) -> PersistenceFuture<'_, Option<Snapshot>> {
        Box::pin(async move {
            let catalog = Self::read_optional(&self.path(StorageKey::Catalog)).await?;
            let sales = Self::read_optional(&self.path(StorageKey::Sales)).await?;
            let snapshot = decode_snapshot(catalog.as_deref(), sales.as_deref())?;

            tracing::debug!(
                dir = %self.dir.display(),
                found = snapshot.is_some(),
                "Loaded shop data"
            );
            Ok(snapshot)
        })
    }

    fn save(&self, key: StorageKey, blob: String) -> PersistenceFuture<'_, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir).await?;

            let path = self.path(key);
            let tmp_path = self
                .dir
                .join(format!("{}.{}.tmp", key.file_name(), uuid::Uuid::new_v4()));
            tokio::fs::write(&tmp_path, blob.as_bytes()).await?;
            if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e.into());
            }

            tracing::debug!(key = %key, bytes = blob.len(), path = %path.display(), "Saved blob");
            Ok(())
        })
    }

    fn clear_all(&self) -> PersistenceFuture<'_, ()> {
        Box::pin(async move {
            for key in StorageKey::ALL {
                match tokio::fs::remove_file(self.path(key)).await {
                    Ok(()) => {},
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                    Err(e) => return Err(e.into()),
                }
            }
            tracing::info!(dir = %self.dir.display(), "Cleared shop data");
            Ok(())
        })
    }
}

/// Map-backed store with save counters and failure injection
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryInner>,
}

#[derive(Debug, Default)]
struct InMemoryInner {
    blobs: Mutex<HashMap<StorageKey, String>>,
    saves: Mutex<HashMap<StorageKey, usize>>,
    clears: AtomicUsize,
    fail_saves: AtomicBool,
    fail_load: AtomicBool,
    save_delay_ms: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded.
    pub fn with_snapshot(snapshot: &Snapshot) -> Result<Self, PersistenceError> {
        let store = Self::new();
        {
            let mut blobs = store.blobs();
            blobs.insert(StorageKey::Catalog, encode_catalog(&snapshot.products)?);
            blobs.insert(StorageKey::Sales, encode_sales(&snapshot.sales)?);
        }
        Ok(store)
    }

    /// Stored blob for a key
    #[must_use]
    pub fn blob(&self, key: StorageKey) -> Option<String> {
        self.blobs().get(&key).cloned()
    }

    /// Decodes what is currently stored
    ///
    /// # Errors
    ///
    /// Returns an error if a stored blob cannot be decoded.
    pub fn snapshot(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let blobs = self.blobs();
        decode_snapshot(
            blobs.get(&StorageKey::Catalog).map(String::as_str),
            blobs.get(&StorageKey::Sales).map(String::as_str),
        )
    }

    /// Number of successful saves for a key
    #[must_use]
    pub fn save_count(&self, key: StorageKey) -> usize {
        self.inner
            .saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    /// Number of `clear_all` calls
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.inner.clears.load(Ordering::SeqCst)
    }

    /// Makes subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Makes every save take at least `delay` before it lands
    pub fn set_save_delay(&self, delay: std::time::Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.save_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Makes subsequent loads fail (or succeed again)
    pub fn set_fail_load(&self, fail: bool) {
        self.inner.fail_load.store(fail, Ordering::SeqCst);
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, String>> {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Persistence for InMemoryStore {
    fn load(&self) -> PersistenceFuture<'_, Option<Snapshot>> {
        Box::pin(async move {
            if self.inner.fail_load.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("load disabled".into()));
            }
            self.snapshot()
        })
    }

    fn save(&self, key: StorageKey, blob: String) -> PersistenceFuture<'_, ()> {
        Box::pin(async move {
            if self.inner.fail_saves.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unavailable("save disabled".into()));
            }
            let delay = self.inner.save_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            self.blobs().insert(key, blob);
            *self
                .inner
                .saves
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(0) += 1;
            Ok(())
        })
    }

    fn clear_all(&self) -> PersistenceFuture<'_, ()> {
        Box::pin(async move {
            self.blobs().clear();
            self.inner.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pricing::price_for;
    use crate::types::{BeverageKind, ProductId, Subtype};

    fn products() -> Vec<Product> {
        let subtype = Subtype::Beverage(BeverageKind::Milk);
        vec![Product {
            id: ProductId::new(),
            title: "Fresa".into(),
            subtype,
            price: price_for(subtype),
            stock: 7,
        }]
    }

    #[tokio::test]
    async fn file_store_first_run_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let products = products();

        store
            .save(StorageKey::Catalog, encode_catalog(&products).unwrap())
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.products, products);
        assert!(loaded.sales.is_empty());
        let mut entries = tokio::fs::read_dir(store.dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }

        store.clear_all().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_blob() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("sales.json"), "{not json").await.unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(matches!(
            store.load().await,
            Err(PersistenceError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_store_counts_and_fails_on_demand() {
        let store = InMemoryStore::new();
        store.save(StorageKey::Sales, "[]".into()).await.unwrap();
        assert_eq!(store.save_count(StorageKey::Sales), 1);
        assert_eq!(store.save_count(StorageKey::Catalog), 0);

        store.set_fail_saves(true);
        assert!(store.save(StorageKey::Sales, "[]".into()).await.is_err());
        assert_eq!(store.save_count(StorageKey::Sales), 1);

        store.set_fail_load(true);
        assert!(store.load().await.is_err());
        store.set_fail_load(false);

        store.clear_all().await.unwrap();
        assert_eq!(store.clear_count(), 1);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_file_saves_publish_a_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        let first = "a".repeat(64 * 1024);
        let second = "b".repeat(64 * 1024);

        let a = tokio::spawn({
            let store = Arc::clone(&store);
            let blob = first.clone();
            async move { store.save(StorageKey::Catalog, blob).await }
        });
        let b = tokio::spawn({
            let store = Arc::clone(&store);
            let blob = second.clone();
            async move { store.save(StorageKey::Catalog, blob).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = tokio::fs::read_to_string(dir.path().join("catalog.json"))
            .await
            .unwrap();
        assert!(stored == first || stored == second);
    }

    #[tokio::test]
    async fn write_gate_drops_writes_from_before_a_clear() {
        let store = InMemoryStore::new();
        let gate = WriteGate::new();

        assert!(gate.save(&store, 0, StorageKey::Catalog, "[]".into()).await.unwrap());
        gate.clear(&store, 1).await.unwrap();

        let stale = gate.save(&store, 0, StorageKey::Catalog, "[]".into()).await.unwrap();
        assert!(!stale);
        assert_eq!(store.blob(StorageKey::Catalog), None);
        assert_eq!(store.save_count(StorageKey::Catalog), 1);

        assert!(gate.save(&store, 1, StorageKey::Sales, "[]".into()).await.unwrap());
        assert_eq!(store.save_count(StorageKey::Sales), 1);
    }

    #[tokio::test]
    async fn clear_waits_for_a_started_write() {
        let store = InMemoryStore::new();
        store.set_save_delay(std::time::Duration::from_millis(50));
        let gate = Arc::new(WriteGate::new());

        let write = tokio::spawn({
            let (gate, store) = (Arc::clone(&gate), store.clone());
            async move { gate.save(&store, 0, StorageKey::Catalog, "[]".into()).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        gate.clear(&store, 1).await.unwrap();
        assert!(write.await.unwrap().unwrap());

        assert_eq!(store.save_count(StorageKey::Catalog), 1);
        assert_eq!(store.blob(StorageKey::Catalog), None);
    }

    #[test]
    fn effect_ids_are_per_key() {
        assert_eq!(StorageKey::Catalog.effect_id().as_str(), "persist:catalog");
        assert_ne!(StorageKey::Catalog.effect_id(), StorageKey::Sales.effect_id());
    }
}
