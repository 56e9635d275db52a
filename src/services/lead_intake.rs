//! Lead intake - capability layer
//!
//! Decides per candidate whether it becomes a new engagement attempt:
//! contact gate → business matching → in-cycle dedup → cooldown gate.
//! One `LeadIntake` lives for exactly one cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::StoreResult;
use crate::infrastructure::LeadStore;
use crate::models::{
    BusinessCriteria, BusinessRecord, Country, Enrichment, LeadPayload, LeadRecord, NewBusiness,
    NewLead, QueryTask, ScrapedCandidate,
};
use crate::services::phone::PhoneNormalizer;

/// Outcome of [`LeadIntake::admit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeDecision {
    /// Dropped before touching the store
    Rejected(RejectReason),
    /// Known business that must not be engaged now
    Skipped {
        business: BusinessRecord,
        reason: SkipReason,
    },
    Admitted(AdmittedLead),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither a usable phone nor an email
    NoContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already handled earlier in this cycle
    SeenThisCycle,
    /// Last lead was dispatched within the re-engagement cooldown
    CoolingDown { dispatched_at: DateTime<Utc> },
}

/// A candidate cleared for enrichment and dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedLead {
    pub business: BusinessRecord,
    /// Phone already normalized
    pub candidate: ScrapedCandidate,
    pub task: QueryTask,
}

impl AdmittedLead {
    pub fn payload(&self, enrichment: &Enrichment, message: &str) -> LeadPayload {
        LeadPayload {
            name: self.candidate.name.clone(),
            industry: enrichment.industry.clone(),
            pain_point: enrichment.pain_point.clone(),
            message: message.to_string(),
            website: self.candidate.website.clone(),
            phone: self.candidate.phone.clone(),
            email: self.candidate.email.clone(),
            location: self.task.location.clone(),
            country: self.task.country,
        }
    }
}

pub struct LeadIntake {
    store: Arc<dyn LeadStore>,
    normalizer: PhoneNormalizer,
    calling_codes: HashMap<Country, String>,
    cooldown: Duration,
    seen: Mutex<HashSet<i64>>,
}

impl LeadIntake {
    pub fn new(
        store: Arc<dyn LeadStore>,
        normalizer: PhoneNormalizer,
        calling_codes: HashMap<Country, String>,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            normalizer,
            calling_codes,
            cooldown,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Fresh intake for one cycle
    pub fn for_cycle(store: Arc<dyn LeadStore>, config: &Config) -> Self {
        let calling_codes = Country::ALL
            .into_iter()
            .map(|c| (c, config.calling_code(c)))
            .collect();
        Self::new(
            store,
            PhoneNormalizer::new(config.phone.bare_number_policy),
            calling_codes,
            config.reengagement_cooldown(),
        )
    }

    /// Gate one candidate scraped for `task`
    pub async fn admit(
        &self,
        mut candidate: ScrapedCandidate,
        task: &QueryTask,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeDecision> {
        let calling_code = self.calling_code(task.country);
        candidate.phone = candidate
            .phone
            .as_deref()
            .and_then(|raw| self.normalizer.normalize(raw, &calling_code));

        if !candidate.has_contact() {
            debug!("Rejecting '{}': no reachable channel", candidate.name);
            return Ok(IntakeDecision::Rejected(RejectReason::NoContact));
        }

        let business = self.resolve_business(&candidate, now).await?;

        if !self.seen.lock().await.insert(business.id) {
            return Ok(IntakeDecision::Skipped {
                business,
                reason: SkipReason::SeenThisCycle,
            });
        }

        if let Some(lead) = self.store.find_latest_lead(business.id).await? {
            if let Some(dispatched_at) = lead.dispatched_at {
                if now - dispatched_at < self.cooldown {
                    return Ok(IntakeDecision::Skipped {
                        business,
                        reason: SkipReason::CoolingDown { dispatched_at },
                    });
                }
            }
        }

        Ok(IntakeDecision::Admitted(AdmittedLead {
            business,
            candidate,
            task: task.clone(),
        }))
    }

    /// Persist the engagement attempt for an admitted candidate
    pub async fn commit(
        &self,
        admitted: &AdmittedLead,
        enrichment: &Enrichment,
        message: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<LeadRecord> {
        self.store
            .create_lead(&NewLead {
                business_id: admitted.business.id,
                industry: enrichment.industry.clone(),
                pain_point: enrichment.pain_point.clone(),
                recommended_solution: enrichment.recommended_solution.clone(),
                message: message.to_string(),
                created_at: now,
            })
            .await
    }

    /// Record a successful dispatch acknowledgment
    pub async fn confirm_dispatch(&self, lead: &LeadRecord, at: DateTime<Utc>) -> StoreResult<()> {
        self.store.mark_dispatched(lead.id, at).await
    }

    /// Match by name + phone, then name + website, then name; create otherwise
    async fn resolve_business(
        &self,
        candidate: &ScrapedCandidate,
        now: DateTime<Utc>,
    ) -> StoreResult<BusinessRecord> {
        for criteria in match_criteria(candidate) {
            if let Some(business) = self.store.find_business(&criteria).await? {
                debug!("'{}' matched business #{} by {:?}", candidate.name, business.id, criteria);
                return Ok(business);
            }
        }

        self.store
            .create_business(&NewBusiness {
                name: candidate.name.clone(),
                website: candidate.website.clone(),
                phone: candidate.phone.clone(),
                created_at: now,
            })
            .await
    }

    fn calling_code(&self, country: Country) -> String {
        self.calling_codes
            .get(&country)
            .cloned()
            .unwrap_or_else(|| country.default_calling_code().to_string())
    }
}

/// Matching criteria from most to least specific
fn match_criteria(candidate: &ScrapedCandidate) -> Vec<BusinessCriteria> {
    let mut criteria = Vec::with_capacity(3);
    if let Some(phone) = &candidate.phone {
        criteria.push(BusinessCriteria::NameAndPhone {
            name: candidate.name.clone(),
            phone: phone.clone(),
        });
    }
    if let Some(website) = &candidate.website {
        criteria.push(BusinessCriteria::NameAndWebsite {
            name: candidate.name.clone(),
            website: website.clone(),
        });
    }
    criteria.push(BusinessCriteria::Name(candidate.name.clone()));
    criteria
}
