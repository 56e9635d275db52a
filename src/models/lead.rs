use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Country;

/// Persisted identity of a physical business
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: i64,
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for a business seen for the first time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBusiness {
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How a sighting is matched against known businesses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessCriteria {
    NameAndPhone { name: String, phone: String },
    NameAndWebsite { name: String, website: String },
    /// Deliberately loose: same-named branches collide
    Name(String),
}

impl BusinessCriteria {
    pub fn matches(&self, business: &BusinessRecord) -> bool {
        match self {
            BusinessCriteria::NameAndPhone { name, phone } => {
                business.name == *name && business.phone.as_deref() == Some(phone.as_str())
            }
            BusinessCriteria::NameAndWebsite { name, website } => {
                business.name == *name && business.website.as_deref() == Some(website.as_str())
            }
            BusinessCriteria::Name(name) => business.name == *name,
        }
    }
}

/// One engagement attempt against a business
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: i64,
    pub business_id: i64,
    pub industry: String,
    pub pain_point: String,
    pub recommended_solution: String,
    pub message: String,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data for a new engagement attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub business_id: i64,
    pub industry: String,
    pub pain_point: String,
    pub recommended_solution: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Classification returned by the enricher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub industry: String,
    pub pain_point: String,
    pub recommended_solution: String,
}

/// Everything the dispatcher needs to announce a lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadPayload {
    pub name: String,
    pub industry: String,
    pub pain_point: String,
    pub message: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: String,
    pub country: Country,
}

/// Rows removed by a retention purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub leads: u64,
    pub businesses: u64,
    pub rotations: u64,
}
