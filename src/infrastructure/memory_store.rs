//! In-process [`LeadStore`] for dry runs and tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::store::LeadStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    BusinessCriteria, BusinessRecord, LeadRecord, NewBusiness, NewLead, PurgeReport,
    RotationRecord,
};

#[derive(Default)]
struct Tables {
    businesses: Vec<BusinessRecord>,
    leads: Vec<LeadRecord>,
    rotations: HashMap<(String, String), RotationRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every business, in creation order
    pub async fn businesses(&self) -> Vec<BusinessRecord> {
        self.tables.lock().await.businesses.clone()
    }

    /// Snapshot of every lead, in creation order
    pub async fn leads(&self) -> Vec<LeadRecord> {
        self.tables.lock().await.leads.clone()
    }

    /// Insert a lead with an arbitrary dispatch time
    pub async fn seed_lead(&self, mut lead: LeadRecord) -> LeadRecord {
        let mut tables = self.tables.lock().await;
        lead.id = tables.next_id();
        tables.leads.push(lead.clone());
        lead
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn find_business(&self, criteria: &BusinessCriteria) -> StoreResult<Option<BusinessRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.businesses.iter().find(|b| criteria.matches(b)).cloned())
    }

    async fn create_business(&self, data: &NewBusiness) -> StoreResult<BusinessRecord> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .businesses
            .iter()
            .find(|b| b.name == data.name && b.phone == data.phone && b.website == data.website)
        {
            return Ok(existing.clone());
        }

        let record = BusinessRecord {
            id: tables.next_id(),
            name: data.name.clone(),
            website: data.website.clone(),
            phone: data.phone.clone(),
            created_at: data.created_at,
        };
        tables.businesses.push(record.clone());
        Ok(record)
    }

    async fn find_latest_lead(&self, business_id: i64) -> StoreResult<Option<LeadRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .leads
            .iter()
            .filter(|l| l.business_id == business_id)
            .max_by_key(|l| (l.created_at, l.id))
            .cloned())
    }

    async fn create_lead(&self, data: &NewLead) -> StoreResult<LeadRecord> {
        let mut tables = self.tables.lock().await;
        let record = LeadRecord {
            id: tables.next_id(),
            business_id: data.business_id,
            industry: data.industry.clone(),
            pain_point: data.pain_point.clone(),
            recommended_solution: data.recommended_solution.clone(),
            message: data.message.clone(),
            dispatched_at: None,
            created_at: data.created_at,
        };
        tables.leads.push(record.clone());
        Ok(record)
    }

    async fn mark_dispatched(&self, lead_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let lead = tables
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or(StoreError::Vanished { entity: "lead" })?;
        lead.dispatched_at = Some(at);
        Ok(())
    }

    async fn upsert_rotation(
        &self,
        location: &str,
        industry: &str,
        query: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let record = RotationRecord {
            location: location.to_string(),
            industry: industry.to_string(),
            query: query.to_string(),
            last_queried_at: at,
        };
        self.tables
            .lock()
            .await
            .rotations
            .insert((location.to_string(), industry.to_string()), record);
        Ok(())
    }

    async fn find_rotation(&self, location: &str, industry: &str) -> StoreResult<Option<RotationRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rotations
            .get(&(location.to_string(), industry.to_string()))
            .cloned())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<PurgeReport> {
        let mut tables = self.tables.lock().await;

        let before = tables.leads.len();
        tables.leads.retain(|l| l.created_at >= cutoff);
        let leads = (before - tables.leads.len()) as u64;

        let Tables {
            businesses,
            leads: remaining,
            ..
        } = &mut *tables;
        let before = businesses.len();
        businesses.retain(|b| b.created_at >= cutoff || remaining.iter().any(|l| l.business_id == b.id));
        let purged_businesses = (before - businesses.len()) as u64;

        let before = tables.rotations.len();
        tables.rotations.retain(|_, r| r.last_queried_at >= cutoff);
        let rotations = (before - tables.rotations.len()) as u64;

        Ok(PurgeReport {
            leads,
            businesses: purged_businesses,
            rotations,
        })
    }
}
