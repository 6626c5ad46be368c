//! The record-query seam that the enrichment layer wraps.

use crate::error::Result;
use crate::types::{CatalogRecord, Constraint, QueryOptions};

/// A source of catalog records: lookup by identifier and filtered search.
///
/// Implementations own selection, ordering and pagination. Callers must not
/// assume anything beyond what the provider returns.
#[allow(async_fn_in_trait)]
pub trait RecordProvider {
    /// Fetch the records whose identifiers are in `ids`.
    async fn query_ids(&self, ids: &[String]) -> Result<Vec<CatalogRecord>>;

    /// Run a filtered search. Returns the total number of matching records
    /// (ignoring pagination) and the requested page.
    async fn query(
        &self,
        constraint: &Constraint,
        options: &QueryOptions,
    ) -> Result<(u64, Vec<CatalogRecord>)>;
}
