use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Country;

/// One search to run in one scrape cycle. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTask {
    pub query_text: String,
    pub location: String,
    pub industry: String,
    pub country: Country,
}

impl QueryTask {
    /// Interpolate `{industry}` / `{location}` into a template
    pub fn from_template(template: &str, location: &str, industry: &str, country: Country) -> Self {
        let query_text = template
            .replace("{industry}", industry)
            .replace("{location}", location);
        Self {
            query_text,
            location: location.to_string(),
            industry: industry.to_string(),
            country,
        }
    }
}

/// Last time a `(location, industry)` pair was queried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRecord {
    pub location: String,
    pub industry: String,
    pub query: String,
    pub last_queried_at: DateTime<Utc>,
}

impl RotationRecord {
    /// A pair is eligible again once a full rotation period has elapsed
    pub fn is_eligible(&self, now: DateTime<Utc>, rotation_period: Duration) -> bool {
        now - self.last_queried_at >= rotation_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_template_interpolates_both_slots() {
        let task = QueryTask::from_template(
            "best {industry} in {location}",
            "Sandton",
            "Estate Agents",
            Country::SouthAfrica,
        );
        assert_eq!(task.query_text, "best Estate Agents in Sandton");
        assert_eq!(task.location, "Sandton");
    }

    #[test]
    fn test_rotation_eligibility_boundary() {
        let now = Utc::now();
        let record = RotationRecord {
            location: "Gweru".into(),
            industry: "Realtors".into(),
            query: "Realtors Gweru".into(),
            last_queried_at: now - Duration::days(7),
        };
        assert!(record.is_eligible(now, Duration::days(7)));
        assert!(!record.is_eligible(now - Duration::seconds(1), Duration::days(7)));
    }
}
