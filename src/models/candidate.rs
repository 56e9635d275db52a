use serde::{Deserialize, Serialize};

/// A business extracted from one result node, not yet gated by intake
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrapedCandidate {
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub category: Option<String>,
}

impl ScrapedCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// At least one reachable channel
    pub fn has_contact(&self) -> bool {
        self.phone.is_some() || self.email.is_some()
    }
}
