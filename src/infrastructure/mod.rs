pub mod js_executor;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;

pub use js_executor::JsExecutor;
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use store::LeadStore;
