//! Ticket and apparel browsing.
//!
//! Both categories share these handlers; the router binds the category.

use axum::{Json, extract::State};
use serde::Deserialize;

use festiv_core::{ProductCategory, ProductId};

use super::page;
use crate::db::catalog::ListFilter;
use crate::error::Result;
use crate::extract;
use crate::middleware::RequireUser;
use crate::models::{Product, ProductView};
use crate::services::CatalogService;
use crate::state::AppState;

/// `?page&limit&location&subcategory`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub location: Option<String>,
    pub subcategory: Option<String>,
}

/// `?page&limit&q`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub q: String,
}

pub async fn list(
    category: ProductCategory,
    state: AppState,
    query: ListQuery,
) -> Result<Json<Vec<Product>>> {
    let filter = ListFilter {
        location: query.location.filter(|_| category == ProductCategory::Ticket),
        subcategory: query.subcategory,
        name_prefix: None,
    };
    let products = CatalogService::new(state.pool())
        .list(category, &filter, page(query.page, query.limit))
        .await?;
    Ok(Json(products))
}

pub async fn search(
    category: ProductCategory,
    state: AppState,
    query: SearchQuery,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.pool())
        .search(category, &query.q, page(query.page, query.limit))
        .await?;
    Ok(Json(products))
}

pub async fn details(
    category: ProductCategory,
    state: AppState,
    id: ProductId,
) -> Result<Json<ProductView>> {
    Ok(Json(CatalogService::new(state.pool()).details(category, id).await?))
}

/// Browsing routes for one category, mounted at `/tickets` or `/apparels`.
pub fn routes(category: ProductCategory) -> axum::Router<AppState> {
    use axum::routing::get;

    axum::Router::new()
        .route(
            "/",
            get(
                move |State(state): State<AppState>,
                      _user: RequireUser,
                      extract::Query(query): extract::Query<ListQuery>| {
                    list(category, state, query)
                },
            ),
        )
        .route(
            "/search",
            get(
                move |State(state): State<AppState>,
                      _user: RequireUser,
                      extract::Query(query): extract::Query<SearchQuery>| {
                    search(category, state, query)
                },
            ),
        )
        .route(
            "/{id}",
            get(
                move |State(state): State<AppState>,
                      _user: RequireUser,
                      extract::Path(id): extract::Path<ProductId>| {
                    details(category, state, id)
                },
            ),
        )
}

#[cfg(test)]
mod tests {
    use festiv_core::Pagination;

    use super::*;

    #[test]
    fn test_default_page() {
        assert_eq!(page(None, None), Pagination::default());
        assert_eq!(page(Some(0), Some(1000)), Pagination::new(1, Pagination::MAX_LIMIT));
    }
}
