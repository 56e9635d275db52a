pub mod dispatcher;
pub mod enricher;
pub mod field_extractor;
pub mod lead_intake;
pub mod message;
pub mod navigator;
pub mod phone;
pub mod query_rotator;
pub mod retention;
pub mod retry;

pub use dispatcher::{DiscordDispatcher, Dispatcher, LogDispatcher};
pub use enricher::{Enricher, FallbackEnricher, LlmEnricher};
pub use field_extractor::FieldExtractor;
pub use lead_intake::{AdmittedLead, IntakeDecision, LeadIntake};
pub use message::MessageGenerator;
pub use navigator::{NavState, ReadyPage, ResultPageNavigator};
pub use phone::{BareNumberPolicy, PhoneNormalizer};
pub use query_rotator::QueryRotator;
pub use retention::RetentionPolicy;
pub use retry::RetryPolicy;
