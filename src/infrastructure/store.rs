//! Persistence capability
//!
//! Every write is a single-row create or upsert; no operation needs a
//! multi-row transaction. Any error here is fatal for the running cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    BusinessCriteria, BusinessRecord, LeadRecord, NewBusiness, NewLead, PurgeReport,
    RotationRecord,
};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Oldest business satisfying `criteria`
    async fn find_business(&self, criteria: &BusinessCriteria) -> StoreResult<Option<BusinessRecord>>;

    /// Create a business, or return the existing row with the same identity
    ///
    /// Identity is `(name, phone, website)`; concurrent creation of the same
    /// business yields one row.
    async fn create_business(&self, data: &NewBusiness) -> StoreResult<BusinessRecord>;

    /// Most recently created lead of a business
    async fn find_latest_lead(&self, business_id: i64) -> StoreResult<Option<LeadRecord>>;

    async fn create_lead(&self, data: &NewLead) -> StoreResult<LeadRecord>;

    async fn mark_dispatched(&self, lead_id: i64, at: DateTime<Utc>) -> StoreResult<()>;

    async fn upsert_rotation(
        &self,
        location: &str,
        industry: &str,
        query: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn find_rotation(&self, location: &str, industry: &str) -> StoreResult<Option<RotationRecord>>;

    /// Drop leads and rotation history older than `cutoff`, then businesses
    /// older than `cutoff` that no longer have any lead
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<PurgeReport>;
}
