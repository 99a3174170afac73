use std::sync::Arc;

use growth::{DatasetError, DatasetSources, Datasets};
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::info;

#[derive(Debug)]
pub enum CacheError {
    Load(DatasetError),
    Join(JoinError),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Load(e) => write!(f, "failed to load datasets: {e}"),
            CacheError::Join(e) => write!(f, "dataset loader task failed: {e}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Load(e) => Some(e),
            CacheError::Join(e) => Some(e),
        }
    }
}

/// Lazily loaded, clearable copy of the two input layers.
///
/// The lock is held across the load so concurrent first requests read the
/// files once. A failed load leaves the slot empty and the next caller
/// retries.
pub struct DatasetCache {
    sources: DatasetSources,
    slot: Mutex<Option<Arc<Datasets>>>,
}

impl DatasetCache {
    pub fn new(sources: DatasetSources) -> Self {
        Self {
            sources,
            slot: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<Datasets>, CacheError> {
        let mut slot = self.slot.lock().await;
        if let Some(data) = slot.as_ref() {
            return Ok(Arc::clone(data));
        }

        let sources = self.sources.clone();
        let data = tokio::task::spawn_blocking(move || Datasets::load(&sources))
            .await
            .map_err(CacheError::Join)?
            .map_err(CacheError::Load)?;
        info!(
            "loaded {} growth rows and {} boundary rows",
            data.growth.len(),
            data.boundaries.len()
        );

        let data = Arc::new(data);
        *slot = Some(Arc::clone(&data));
        Ok(data)
    }

    /// Drops the cached tables; returns whether anything was cached.
    pub async fn clear(&self) -> bool {
        self.slot.lock().await.take().is_some()
    }

    pub async fn is_loaded(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use growth::{ColumnMapping, DatasetSources};
    use serde_json::json;

    use super::{CacheError, DatasetCache};

    fn write_layers(dir: &Path) -> DatasetSources {
        let ring = json!([[[-75.6, 6.2], [-75.59, 6.2], [-75.59, 6.21], [-75.6, 6.2]]]);
        let growth = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"LIMITECOMU": "Comuna 1", "NOMBRE": "Popular", "SUBTIPO_BA": 1,
                               "area_cre_1": 2.0, "area_creci": 20000.0, "porcentaje": 10.0},
                "geometry": {"type": "Polygon", "coordinates": ring}
            }]
        });
        let boundaries = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"NOMBRE": "Popular"},
                "geometry": {"type": "Polygon", "coordinates": ring}
            }]
        });
        let growth_path = dir.join("growth.geojson");
        let boundary_path = dir.join("boundaries.geojson");
        std::fs::write(&growth_path, growth.to_string()).unwrap();
        std::fs::write(&boundary_path, boundaries.to_string()).unwrap();
        DatasetSources {
            growth_path,
            growth_crs: None,
            boundary_path,
            boundary_crs: None,
            columns: ColumnMapping::default(),
        }
    }

    #[tokio::test]
    async fn loads_once_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(write_layers(dir.path()));
        assert!(!cache.is_loaded().await);

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.growth.len(), 1);

        assert!(cache.clear().await);
        assert!(!cache.is_loaded().await);
        assert!(!cache.clear().await);

        let reloaded = cache.get().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
    }

    #[tokio::test]
    async fn failed_load_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = write_layers(dir.path());
        sources.growth_path = dir.path().join("missing.shp");
        let cache = DatasetCache::new(sources);

        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, CacheError::Load(_)));
        assert!(!cache.is_loaded().await);
    }
}
