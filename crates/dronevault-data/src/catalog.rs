//! Read-only survey catalog over SQLite.
//!
//! Every lookup goes to the database; nothing is cached between calls.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use dronevault_core::{
    AssetCatalog, AssetId, Centroid, CoreError, CoreResult, ProductKind, ProductRecord, SiteId,
    SiteRecord,
};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::{debug, warn};

use crate::error::{DataError, Result};

const RESOLVE_POINTCLOUD: &str = r"SELECT path FROM pointclouds WHERE dataID = ?";

// Rows are read by position: sites are (siteID, name, _, _, centroid, ..) and
// products are (dataID, siteID, path, date, ..).
const SELECT_SITES: &str = r"SELECT * FROM sites ORDER BY siteID";

const SELECT_SITE: &str = r"SELECT * FROM sites WHERE siteID = ?";

const SELECT_POINTCLOUDS: &str = r"
    SELECT * FROM pointclouds
    WHERE (? IS NULL OR siteID = ?)
    ORDER BY dataID
";

const SELECT_ORTHO: &str = r"
    SELECT * FROM ortho
    WHERE (? IS NULL OR siteID = ?)
    ORDER BY dataID
";

const SELECT_DSM: &str = r"
    SELECT * FROM dsm
    WHERE (? IS NULL OR siteID = ?)
    ORDER BY dataID
";

const PING: &str = "SELECT 1";

const SITE_ID_COLUMN: usize = 0;
const SITE_NAME_COLUMN: usize = 1;
const SITE_CENTROID_COLUMN: usize = 4;

/// `SQLite`-backed implementation of [`AssetCatalog`].
#[derive(Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Wrap an existing pool without touching its schema.
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open an existing record store at `url`.
    ///
    /// The database must already exist and is never written to, so stores
    /// produced by other tooling are served as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = open_pool(url, false).await?;
        Ok(Self::from_pool(pool))
    }

    /// Open (creating if needed) the database at `url` and apply the bundled
    /// schema migrations. Used for fresh installs and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn connect_migrated(url: &str) -> Result<Self> {
        let store = Self::from_pool(open_pool(url, true).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|source| DataError::MigrationFailed { source })?;
        debug!("catalog schema migrated");
        Ok(())
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Look up the stored path of a point cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_pointcloud_path(&self, id: AssetId) -> Result<Option<PathBuf>> {
        let path = sqlx::query_scalar::<_, String>(RESOLVE_POINTCLOUD)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::query("catalog.resolve", source))?;
        Ok(path.map(PathBuf::from))
    }

    /// Fetch every site ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row has an unexpected shape.
    pub async fn fetch_sites(&self) -> Result<Vec<SiteRecord>> {
        let rows = sqlx::query(SELECT_SITES)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DataError::query("catalog.sites", source))?;
        rows.iter()
            .map(|row| {
                site_from_row(row).map_err(|source| DataError::query("catalog.sites", source))
            })
            .collect()
    }

    /// Fetch a single site.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row has an unexpected shape.
    pub async fn fetch_site(&self, id: SiteId) -> Result<Option<SiteRecord>> {
        let row = sqlx::query(SELECT_SITE)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::query("catalog.site", source))?;
        row.as_ref()
            .map(site_from_row)
            .transpose()
            .map_err(|source| DataError::query("catalog.site", source))
    }

    /// Fetch products of one family, optionally restricted to a site.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row has an unexpected shape.
    pub async fn fetch_products(
        &self,
        kind: ProductKind,
        site: Option<SiteId>,
    ) -> Result<Vec<ProductRecord>> {
        let site_filter = site.map(|id| id.0);
        let rows = sqlx::query(products_query(kind))
            .bind(site_filter)
            .bind(site_filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DataError::query("catalog.products", source))?;
        rows.iter()
            .map(|row| {
                product_from_row(kind, row)
                    .map_err(|source| DataError::query("catalog.products", source))
            })
            .collect()
    }
}

async fn open_pool(url: &str, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|source| DataError::query("catalog.parse_url", source))?
        .create_if_missing(create);
    // In-memory databases live as long as their connection, so pin one.
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };
    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(|source| DataError::query("catalog.connect", source))?;
    debug!(in_memory, create, "catalog database opened");
    Ok(pool)
}

const fn products_query(kind: ProductKind) -> &'static str {
    match kind {
        ProductKind::PointCloud => SELECT_POINTCLOUDS,
        ProductKind::Ortho => SELECT_ORTHO,
        ProductKind::Dsm => SELECT_DSM,
    }
}

fn site_from_row(row: &SqliteRow) -> std::result::Result<SiteRecord, sqlx::Error> {
    let id: i64 = row.try_get(SITE_ID_COLUMN)?;
    let name: String = row.try_get(SITE_NAME_COLUMN)?;
    let centroid_raw: String = row
        .try_get::<Option<String>, _>(SITE_CENTROID_COLUMN)?
        .unwrap_or_default();
    let centroid = Centroid::parse(&centroid_raw);
    if centroid.is_none() {
        warn!(site_id = id, centroid = %centroid_raw, "site centroid is malformed");
    }
    Ok(SiteRecord {
        id: SiteId(id),
        name,
        centroid_raw,
        centroid,
    })
}

fn product_from_row(
    kind: ProductKind,
    row: &SqliteRow,
) -> std::result::Result<ProductRecord, sqlx::Error> {
    let path: String = row.try_get(2)?;
    Ok(ProductRecord {
        id: AssetId(row.try_get(0)?),
        site_id: SiteId(row.try_get(1)?),
        kind,
        path: PathBuf::from(path),
        captured_on: row.try_get(3)?,
    })
}

#[async_trait]
impl AssetCatalog for CatalogStore {
    async fn resolve(&self, id: AssetId) -> CoreResult<PathBuf> {
        self.find_pointcloud_path(id)
            .await?
            .ok_or_else(|| CoreError::not_found("pointcloud", id))
    }

    async fn list_sites(&self) -> CoreResult<Vec<SiteRecord>> {
        Ok(self.fetch_sites().await?)
    }

    async fn site(&self, id: SiteId) -> CoreResult<SiteRecord> {
        self.fetch_site(id)
            .await?
            .ok_or_else(|| CoreError::not_found("site", id))
    }

    async fn list_products(&self, site: Option<SiteId>) -> CoreResult<Vec<ProductRecord>> {
        let mut products = Vec::new();
        for kind in [ProductKind::PointCloud, ProductKind::Ortho, ProductKind::Dsm] {
            products.extend(self.fetch_products(kind, site).await?);
        }
        Ok(products)
    }

    async fn ping(&self) -> CoreResult<()> {
        sqlx::query(PING)
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::query("catalog.ping", source))?;
        Ok(())
    }
}
