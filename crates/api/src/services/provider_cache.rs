//! Short-lived cache of provider list pages.

use std::sync::Arc;
use std::time::Duration;

use domain::models::{PartnerQuery, Provider};
use moka::future::Cache;
use persistence::repositories::ProviderRepository;
use shared::pagination::{PageRequest, Paginated};
use tracing::debug;

use crate::config::CacheConfig;

/// Provider list pages keyed by the full query. Any provider write clears
/// every entry.
#[derive(Clone)]
pub struct ProviderCache {
    pages: Cache<PartnerQuery, Arc<Paginated<Provider>>>,
}

impl ProviderCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pages: Cache::builder()
                .max_capacity(config.provider_capacity)
                .time_to_live(Duration::from_secs(config.provider_ttl_secs))
                .build(),
        }
    }

    /// Returns the cached page or loads it through the repository.
    pub async fn list(
        &self,
        repo: &ProviderRepository,
        query: PartnerQuery,
    ) -> Result<Arc<Paginated<Provider>>, sqlx::Error> {
        if let Some(page) = self.pages.get(&query).await {
            debug!("Provider list served from cache");
            return Ok(page);
        }

        let page_req = PageRequest::new(query.page, query.limit);
        let (providers, total) = repo.list(&query, page_req).await?;
        let page = Arc::new(Paginated::new(providers, page_req, total));
        self.pages.insert(query, page.clone()).await;
        Ok(page)
    }

    pub fn invalidate(&self) {
        self.pages.invalidate_all();
    }

    #[cfg(test)]
    async fn entry_count(&self) -> u64 {
        self.pages.run_pending_tasks().await;
        self.pages.entry_count()
    }
}
