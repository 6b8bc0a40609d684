//! Site catalog listing.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path as AxumPath, State},
};
use dronevault_core::{ProductKind, ProductRecord, SiteId, SiteRecord};
use dronevault_fsops::PathGuard;

use crate::http::constants::{CONVERT_PREFIX, DOWNLOAD_PREFIX};
use crate::http::errors::ApiError;
use crate::models::{DownloadLink, PointCloudLink, SiteResponse};
use crate::state::ApiState;

pub(crate) async fn list_sites(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<SiteResponse>>, ApiError> {
    let sites = state.catalog.list_sites().await?;
    let mut products: BTreeMap<SiteId, Vec<ProductRecord>> = BTreeMap::new();
    for product in state.catalog.list_products(None).await? {
        products.entry(product.site_id).or_default().push(product);
    }
    Ok(Json(
        sites
            .into_iter()
            .map(|site| {
                let owned = products.remove(&site.id).unwrap_or_default();
                site_response(&state.guard, site, owned)
            })
            .collect(),
    ))
}

pub(crate) async fn get_site(
    State(state): State<Arc<ApiState>>,
    AxumPath(site_id): AxumPath<i64>,
) -> Result<Json<SiteResponse>, ApiError> {
    let site = state.catalog.site(SiteId(site_id)).await?;
    let products = state.catalog.list_products(Some(site.id)).await?;
    Ok(Json(site_response(&state.guard, site, products)))
}

fn site_response(guard: &PathGuard, site: SiteRecord, products: Vec<ProductRecord>) -> SiteResponse {
    let mut response = SiteResponse {
        id: site.id,
        name: site.name,
        centroid: site.centroid,
        centroid_raw: site.centroid_raw,
        pointclouds: Vec::new(),
        orthophotos: Vec::new(),
        dsms: Vec::new(),
    };
    for product in products {
        match product.kind {
            ProductKind::PointCloud => response.pointclouds.push(PointCloudLink {
                id: product.id,
                convert_url: format!("{CONVERT_PREFIX}{}", product.id),
                captured_on: product.captured_on,
            }),
            ProductKind::Ortho => response.orthophotos.push(download_link(guard, product)),
            ProductKind::Dsm => response.dsms.push(download_link(guard, product)),
        }
    }
    response
}

fn download_link(guard: &PathGuard, product: ProductRecord) -> DownloadLink {
    DownloadLink {
        id: product.id,
        file_name: product
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        download_url: guard
            .download_href(&product.path)
            .map(|href| format!("{DOWNLOAD_PREFIX}{href}")),
        captured_on: product.captured_on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronevault_core::{AssetId, Centroid};
    use std::path::PathBuf;

    fn product(kind: ProductKind, id: i64, path: &str) -> ProductRecord {
        ProductRecord {
            id: AssetId(id),
            site_id: SiteId(1),
            kind,
            path: PathBuf::from(path),
            captured_on: None,
        }
    }

    #[test]
    fn products_are_grouped_and_linked() -> anyhow::Result<()> {
        let guard = PathGuard::new("/data/surveys")?;
        let site = SiteRecord {
            id: SiteId(1),
            name: "Quarry".into(),
            centroid_raw: "1, 2".into(),
            centroid: Centroid::parse("1, 2"),
        };
        let response = site_response(
            &guard,
            site,
            vec![
                product(ProductKind::PointCloud, 42, "/data/site1/cloud.las"),
                product(ProductKind::Ortho, 3, "/data/surveys/site 1/ortho.tif"),
                product(ProductKind::Dsm, 4, "/elsewhere/dsm.tif"),
            ],
        );

        assert_eq!(response.pointclouds[0].convert_url, "/process_pointcloud/42");
        assert_eq!(
            response.orthophotos[0].download_url.as_deref(),
            Some("/download_file/site%201/ortho.tif")
        );
        assert_eq!(response.dsms[0].file_name, "dsm.tif");
        assert!(response.dsms[0].download_url.is_none());
        Ok(())
    }
}
