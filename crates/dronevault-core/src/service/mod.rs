//! Catalog trait implemented by record-store adapters.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::{AssetId, ProductRecord, SiteId, SiteRecord};

/// Read-only view over the survey record store.
///
/// Implementations must not cache: every call reflects the store as it is at
/// call time.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Resolve a point-cloud identifier to its stored source path, verbatim.
    ///
    /// Unknown identifiers yield [`crate::CoreError::NotFound`]; store
    /// failures yield [`crate::CoreError::Store`].
    async fn resolve(&self, id: AssetId) -> CoreResult<PathBuf>;

    /// List every site in the catalog ordered by identifier.
    async fn list_sites(&self) -> CoreResult<Vec<SiteRecord>>;

    /// Fetch a single site.
    async fn site(&self, id: SiteId) -> CoreResult<SiteRecord>;

    /// List products, optionally restricted to one site.
    async fn list_products(&self, site: Option<SiteId>) -> CoreResult<Vec<ProductRecord>>;

    /// Cheap reachability probe used by health checks.
    async fn ping(&self) -> CoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::ProductKind;
    use std::collections::HashMap;

    struct MapCatalog {
        paths: HashMap<AssetId, PathBuf>,
    }

    #[async_trait]
    impl AssetCatalog for MapCatalog {
        async fn resolve(&self, id: AssetId) -> CoreResult<PathBuf> {
            self.paths
                .get(&id)
                .cloned()
                .ok_or_else(|| CoreError::not_found("pointcloud", id))
        }

        async fn list_sites(&self) -> CoreResult<Vec<SiteRecord>> {
            Ok(Vec::new())
        }

        async fn site(&self, id: SiteId) -> CoreResult<SiteRecord> {
            Err(CoreError::not_found("site", id))
        }

        async fn list_products(&self, _site: Option<SiteId>) -> CoreResult<Vec<ProductRecord>> {
            Ok(self
                .paths
                .iter()
                .map(|(id, path)| ProductRecord {
                    id: *id,
                    site_id: SiteId(1),
                    kind: ProductKind::PointCloud,
                    path: path.clone(),
                    captured_on: None,
                })
                .collect())
        }

        async fn ping(&self) -> CoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn catalog_trait_objects_resolve_paths() -> anyhow::Result<()> {
        let catalog: Box<dyn AssetCatalog> = Box::new(MapCatalog {
            paths: HashMap::from([(AssetId(42), PathBuf::from("/data/site1/cloud.las"))]),
        });
        assert_eq!(
            catalog.resolve(AssetId(42)).await?,
            PathBuf::from("/data/site1/cloud.las")
        );
        let missing = catalog.resolve(AssetId(7)).await;
        assert!(matches!(missing, Err(ref err) if err.is_not_found()));
        assert_eq!(catalog.list_products(None).await?.len(), 1);
        Ok(())
    }
}
