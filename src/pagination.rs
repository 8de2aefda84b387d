use common::Page;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::IntoParams;
use validator::Validate;

use crate::config::PaginationSettings;
use crate::error::ApiError;

/// Page-number pagination parameters
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1 (default: 1)
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    /// Items per page, capped at the configured maximum
    #[serde(rename = "pageSize")]
    #[validate(range(min = 1))]
    pub page_size: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self, settings: &PaginationSettings) -> u64 {
        self.page_size
            .unwrap_or(settings.default_page_size)
            .min(settings.max_page_size)
    }
}

/// Fetches one page of `select`.
///
/// The first page always exists, even when empty; any later page past the
/// last one is an error.
pub async fn fetch_page<'db, E, C>(
    db: &'db C,
    select: Select<E>,
    params: &PageParams,
    settings: &PaginationSettings,
) -> Result<Page<E::Model>, ApiError>
where
    E: EntityTrait,
    E::Model: Sync + 'db,
    C: ConnectionTrait,
{
    let page = params.page();
    let page_size = params.page_size(settings);

    let paginator = select.paginate(db, page_size);
    let count = paginator.num_items().await?;
    let pages = count.div_ceil(page_size);
    if page > 1 && page > pages {
        warn!("Page {} requested but only {} page(s) exist", page, pages);
        return Err(ApiError::InvalidPage);
    }

    let items = paginator.fetch_page(page - 1).await?;
    debug!("Fetched page {} ({} of {} items)", page, items.len(), count);
    Ok(Page::new(items, count, page, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_defaults_and_cap() {
        let settings = PaginationSettings {
            default_page_size: 10,
            max_page_size: 50,
        };

        assert_eq!(PageParams::default().page_size(&settings), 10);
        assert_eq!(PageParams::default().page(), 1);

        let large = PageParams {
            page: Some(2),
            page_size: Some(500),
        };
        assert_eq!(large.page_size(&settings), 50);
        assert_eq!(large.page(), 2);
    }

    #[test]
    fn test_zero_is_invalid() {
        let params = PageParams {
            page: Some(0),
            page_size: None,
        };
        assert!(params.validate().is_err());
    }
}
