//! Query rotation - capability layer
//!
//! Picks the `(location, industry)` pairs to search this cycle, skipping
//! pairs queried within the rotation period. Scan order is a fresh random
//! permutation every cycle so no pair is systematically favoured.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::config::{Config, CountryProfile};
use crate::error::StoreResult;
use crate::infrastructure::LeadStore;
use crate::models::QueryTask;

pub struct QueryRotator {
    countries: Vec<CountryProfile>,
    industries: Vec<String>,
    templates: Vec<String>,
    rotation_period: Duration,
}

impl QueryRotator {
    pub fn new(
        countries: Vec<CountryProfile>,
        industries: Vec<String>,
        templates: Vec<String>,
        rotation_period: Duration,
    ) -> Self {
        Self {
            countries,
            industries,
            templates,
            rotation_period,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.countries.clone(),
            config.industries.clone(),
            config.query_templates.clone(),
            config.rotation_period(),
        )
    }

    /// Up to `queries_per_cycle` tasks for every configured country
    ///
    /// Each emitted pair has its rotation timestamp set to `now` before it is
    /// returned. A short (or empty) batch means every other pair is cooling down.
    pub async fn next_batch<R: Rng + ?Sized>(
        &self,
        store: &dyn LeadStore,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> StoreResult<Vec<QueryTask>> {
        let mut batch = Vec::new();
        for profile in &self.countries {
            let tasks = self.next_for_country(profile, store, now, rng).await?;
            info!(
                "📋 {}: {}/{} queries selected",
                profile.code,
                tasks.len(),
                profile.queries_per_cycle
            );
            batch.extend(tasks);
        }
        Ok(batch)
    }

    async fn next_for_country<R: Rng + ?Sized>(
        &self,
        profile: &CountryProfile,
        store: &dyn LeadStore,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> StoreResult<Vec<QueryTask>> {
        let wanted = profile.queries_per_cycle;
        let mut tasks = Vec::with_capacity(wanted);
        if wanted == 0 || self.templates.is_empty() {
            return Ok(tasks);
        }

        let mut locations: Vec<&String> = profile.locations.iter().collect();
        let mut industries: Vec<&String> = self.industries.iter().collect();
        locations.shuffle(rng);
        industries.shuffle(rng);

        for location in &locations {
            for industry in &industries {
                if let Some(record) = store.find_rotation(location, industry).await? {
                    if !record.is_eligible(now, self.rotation_period) {
                        debug!("Skipping {}/{}: last queried {}", location, industry, record.last_queried_at);
                        continue;
                    }
                }

                let template = &self.templates[rng.gen_range(0..self.templates.len())];
                let task = QueryTask::from_template(template, location, industry, profile.code);
                store
                    .upsert_rotation(location, industry, &task.query_text, now)
                    .await?;
                tasks.push(task);

                if tasks.len() >= wanted {
                    return Ok(tasks);
                }
            }
        }
        Ok(tasks)
    }
}
