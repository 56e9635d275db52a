//! Per-country lead budget for one cycle

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;
use crate::models::Country;

/// Countries without a target are unlimited
#[derive(Debug, Default)]
pub struct LeadQuota {
    remaining: HashMap<Country, AtomicUsize>,
}

impl LeadQuota {
    pub fn new(targets: impl IntoIterator<Item = (Country, usize)>) -> Self {
        Self {
            remaining: targets
                .into_iter()
                .map(|(country, target)| (country, AtomicUsize::new(target)))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .countries
                .iter()
                .filter_map(|p| p.lead_target.map(|t| (p.code, t))),
        )
    }

    /// Claim one lead slot; `false` once the target is reached
    pub fn try_take(&self, country: Country) -> bool {
        match self.remaining.get(&country) {
            None => true,
            Some(left) => left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok(),
        }
    }

    pub fn is_exhausted(&self, country: Country) -> bool {
        self.remaining
            .get(&country)
            .is_some_and(|left| left.load(Ordering::SeqCst) == 0)
    }
}
