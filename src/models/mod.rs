pub mod candidate;
pub mod catalog;
pub mod country;
pub mod lead;
pub mod query;

pub use candidate::ScrapedCandidate;
pub use country::Country;
pub use lead::{
    BusinessCriteria, BusinessRecord, Enrichment, LeadPayload, LeadRecord, NewBusiness, NewLead,
    PurgeReport,
};
pub use query::{QueryTask, RotationRecord};
