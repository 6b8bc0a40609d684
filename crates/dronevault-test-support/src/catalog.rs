//! Seeded in-memory catalogs.

use std::path::Path;

use anyhow::{Context, Result};
use dronevault_core::ProductKind;
use dronevault_data::CatalogStore;

/// In-memory catalog with helpers for inserting rows.
///
/// The store is pinned to a single connection, so every clone sees the same rows.
#[derive(Clone)]
pub struct TestCatalog {
    store: CatalogStore,
}

impl TestCatalog {
    /// Open an empty, migrated in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn new() -> Result<Self> {
        let store = CatalogStore::connect_migrated("sqlite::memory:")
            .await
            .context("failed to open in-memory catalog")?;
        Ok(Self { store })
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> CatalogStore {
        self.store.clone()
    }

    /// Insert a site with its centroid stored verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn site(&self, id: i64, name: &str, centroid: &str) -> Result<()> {
        sqlx::query("INSERT INTO sites (siteID, name, centroid) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(centroid)
            .execute(self.store.pool())
            .await
            .with_context(|| format!("failed to insert site {id}"))?;
        Ok(())
    }

    /// Insert a product row into the table for `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn product(
        &self,
        kind: ProductKind,
        id: i64,
        site: i64,
        path: &Path,
        captured_on: Option<&str>,
    ) -> Result<()> {
        let table = match kind {
            ProductKind::PointCloud => "pointclouds",
            ProductKind::Ortho => "ortho",
            ProductKind::Dsm => "dsm",
        };
        let statement = format!(
            "INSERT INTO {table} (dataID, siteID, path, date) VALUES (?, ?, ?, ?)"
        );
        sqlx::query(&statement)
            .bind(id)
            .bind(site)
            .bind(path.to_string_lossy().into_owned())
            .bind(captured_on)
            .execute(self.store.pool())
            .await
            .with_context(|| format!("failed to insert {} {id}", kind.as_str()))?;
        Ok(())
    }

    /// Shorthand for a point cloud row without a capture date.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn pointcloud(&self, id: i64, site: i64, path: &Path) -> Result<()> {
        self.product(ProductKind::PointCloud, id, site, path, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronevault_core::{AssetCatalog, AssetId};

    #[tokio::test]
    async fn seeded_rows_are_visible_through_the_catalog() -> Result<()> {
        let catalog = TestCatalog::new().await?;
        catalog.site(1, "Quarry", "1.0, 2.0").await?;
        catalog
            .pointcloud(5, 1, Path::new("/data/quarry.las"))
            .await?;
        catalog
            .product(
                ProductKind::Dsm,
                6,
                1,
                Path::new("/data/quarry-dsm.tif"),
                Some("2024-05-02"),
            )
            .await?;

        let store = catalog.store();
        assert_eq!(
            store.resolve(AssetId(5)).await?,
            Path::new("/data/quarry.las")
        );
        assert_eq!(store.list_products(None).await?.len(), 2);
        Ok(())
    }
}
