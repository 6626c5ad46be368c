//! Query interceptor.
//!
//! [`DynRepository`] wraps a [`RecordProvider`] and enriches every record the
//! provider returns before handing it back. Selection, ordering and
//! pagination are the provider's; errors from the provider pass through
//! untouched.

use tracing::{debug, instrument};

use dynrepo_shared::{AppConfig, CatalogRecord, Constraint, QueryOptions, RecordProvider, Result};
use dynrepo_storage::CatalogStore;

use crate::enrichment::Enricher;
use crate::render::{FileTemplateRenderer, TemplateRenderer};

/// A record provider whose results always come back enriched.
pub struct DynRepository<P, R> {
    provider: P,
    enricher: Enricher<R>,
}

impl DynRepository<CatalogStore, FileTemplateRenderer> {
    /// Open the configured records table and template.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        debug!(table = %config.repository.table, "initializing dynamic repository");
        let provider = CatalogStore::from_config(&config.repository).await?;
        let enricher = Enricher::from_config(&config.dynamic)?;
        Ok(Self::new(provider, enricher))
    }
}

impl<P: RecordProvider, R: TemplateRenderer> DynRepository<P, R> {
    pub fn new(provider: P, enricher: Enricher<R>) -> Self {
        Self { provider, enricher }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn enricher(&self) -> &Enricher<R> {
        &self.enricher
    }

    /// Look up records by identifier and enrich them.
    #[instrument(skip_all, fields(ids = ids.len()))]
    pub async fn query_ids(&self, ids: &[String]) -> Result<Vec<CatalogRecord>> {
        debug!("intercepted query_ids");
        let mut records = self.provider.query_ids(ids).await?;
        self.enricher.enrich_records(&mut records)?;
        Ok(records)
    }

    /// Run a filtered search and enrich the returned page. The total count
    /// is the provider's, unchanged.
    #[instrument(skip_all, fields(limit = options.max_records, offset = options.start_position))]
    pub async fn query(
        &self,
        constraint: &Constraint,
        options: &QueryOptions,
    ) -> Result<(u64, Vec<CatalogRecord>)> {
        debug!(constraint = %constraint.where_clause, "intercepted query");
        let (total, mut records) = self.provider.query(constraint, options).await?;
        self.enricher.enrich_records(&mut records)?;
        Ok((total, records))
    }
}
