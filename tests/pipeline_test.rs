//! End-to-end cycle tests against a scripted browser and the in-memory store

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lead_engine::browser::{BrowserSession, SearchPage, SessionFactory};
use lead_engine::config::{CountryProfile, NavigatorSettings};
use lead_engine::error::{BrowserError, DispatchError, EnrichmentError, StoreError, StoreResult};
use lead_engine::models::{
    BusinessCriteria, BusinessRecord, Enrichment, LeadPayload, LeadRecord, NewBusiness, NewLead,
    PurgeReport, RotationRecord,
};
use lead_engine::services::{Dispatcher, Enricher, FieldExtractor};
use lead_engine::{App, AppError, Config, Country, LeadStore, MemoryStore, PipelineOrchestrator, QueryFlow};

const ACME_PAGE: &str = r#"<html><body>
  <div role="article">
    <div role="heading">Acme Realty</div>
    <span>Real estate agency · Sandton</span>
    <span>082 123 4567</span>
    <a href="https://acmerealty.co.za/">Website</a>
  </div>
</body></html>"#;

const TWO_AGENCIES_PAGE: &str = r#"<html><body>
  <div role="article">
    <div role="heading">Acme Realty</div>
    <span>082 123 4567</span>
  </div>
  <div role="article">
    <div role="heading">Bluebird Properties</div>
    <span>011 555 0199</span>
  </div>
</body></html>"#;

const NO_CONTACT_PAGE: &str = r#"<html><body>
  <div role="article">
    <div role="heading">Quiet Estates</div>
    <a href="https://quiet.example/">Website</a>
  </div>
</body></html>"#;

// ========== scripted browser ==========

#[derive(Clone)]
struct Script {
    html: String,
    /// Home loads that fail before the first success, across every session
    home_failures: usize,
    connected: bool,
}

impl Script {
    fn serving(html: &str) -> Self {
        Self {
            html: html.to_string(),
            home_failures: 0,
            connected: true,
        }
    }
}

#[derive(Default)]
struct Counters {
    home_loads: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

struct FakeFactory {
    script: Script,
    counters: Arc<Counters>,
}

impl FakeFactory {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            counters: Arc::default(),
        })
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>, BrowserError> {
        Ok(Box::new(FakePage {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    fn is_connected(&self) -> bool {
        self.script.connected
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    script: Script,
    counters: Arc<Counters>,
    url: Mutex<String>,
}

#[async_trait]
impl SearchPage for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if !url.contains("tbm=lcl")
            && self.counters.home_loads.fetch_add(1, Ordering::SeqCst) < self.script.home_failures
        {
            return Err(BrowserError::Disconnected);
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn click_button(&self, _text: &str) -> Result<bool, BrowserError> {
        Ok(false)
    }

    async fn submit_query(&self, _selector: &str, text: &str) -> Result<bool, BrowserError> {
        *self.url.lock().unwrap() = format!("https://www.google.com/search?q={}&tbm=lcl", text);
        Ok(true)
    }

    async fn click_link(&self, _text: &str) -> Result<bool, BrowserError> {
        Ok(false)
    }

    async fn has_element(&self, _selector: &str) -> Result<bool, BrowserError> {
        Ok(true)
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.script.html.clone())
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

// ========== stub services ==========

struct StubEnricher;

#[async_trait]
impl Enricher for StubEnricher {
    async fn enrich(&self, _name: &str, _category: Option<&str>) -> Result<Enrichment, EnrichmentError> {
        Ok(Enrichment {
            industry: "Real Estate".to_string(),
            pain_point: "Slow response to buyer enquiries".to_string(),
            recommended_solution: "An always-on enquiry assistant".to_string(),
        })
    }
}

/// Never answers within a test's cycle deadline
struct StalledEnricher;

#[async_trait]
impl Enricher for StalledEnricher {
    async fn enrich(&self, name: &str, category: Option<&str>) -> Result<Enrichment, EnrichmentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        StubEnricher.enrich(name, category).await
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    fail: bool,
    sent: Mutex<Vec<LeadPayload>>,
}

impl RecordingDispatcher {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<LeadPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, lead: &LeadPayload) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Rejected {
                status: 500,
                body: "down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(lead.clone());
        Ok(())
    }
}

/// Delegates to a `MemoryStore` but refuses to create leads
struct BrokenLeadStore {
    inner: MemoryStore,
}

#[async_trait]
impl LeadStore for BrokenLeadStore {
    async fn find_business(&self, criteria: &BusinessCriteria) -> StoreResult<Option<BusinessRecord>> {
        self.inner.find_business(criteria).await
    }

    async fn create_business(&self, data: &NewBusiness) -> StoreResult<BusinessRecord> {
        self.inner.create_business(data).await
    }

    async fn find_latest_lead(&self, business_id: i64) -> StoreResult<Option<LeadRecord>> {
        self.inner.find_latest_lead(business_id).await
    }

    async fn create_lead(&self, _data: &NewLead) -> StoreResult<LeadRecord> {
        Err(StoreError::Vanished { entity: "lead" })
    }

    async fn mark_dispatched(&self, lead_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.mark_dispatched(lead_id, at).await
    }

    async fn upsert_rotation(&self, location: &str, industry: &str, query: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.upsert_rotation(location, industry, query, at).await
    }

    async fn find_rotation(&self, location: &str, industry: &str) -> StoreResult<Option<RotationRecord>> {
        self.inner.find_rotation(location, industry).await
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<PurgeReport> {
        self.inner.purge_older_than(cutoff).await
    }
}

// ========== helpers ==========

fn config(locations: &[&str]) -> Config {
    let mut south_africa = CountryProfile::new(Country::SouthAfrica);
    south_africa.queries_per_cycle = locations.len();
    south_africa.locations = locations.iter().map(|l| l.to_string()).collect();

    Config {
        dry_run: true,
        rotation_period_days: 0,
        industries: vec!["Real Estate Agency".to_string()],
        query_templates: vec!["{industry} in {location}".to_string()],
        countries: vec![south_africa],
        navigator: NavigatorSettings {
            backoff_ms: 0,
            consent_settle_ms: 0,
            submit_settle_ms: 0,
            maps_settle_ms: 0,
            final_settle_ms: 0,
            results_timeout_secs: 0,
            ..NavigatorSettings::default()
        },
        ..Config::default()
    }
}

fn pipeline(
    config: Config,
    store: Arc<dyn LeadStore>,
    factory: Arc<FakeFactory>,
    dispatcher: Arc<RecordingDispatcher>,
) -> PipelineOrchestrator {
    pipeline_with_enricher(config, store, factory, dispatcher, Arc::new(StubEnricher))
}

fn pipeline_with_enricher(
    config: Config,
    store: Arc<dyn LeadStore>,
    factory: Arc<FakeFactory>,
    dispatcher: Arc<RecordingDispatcher>,
    enricher: Arc<dyn Enricher>,
) -> PipelineOrchestrator {
    let extractor = FieldExtractor::from_config(&config).unwrap();
    let flow = QueryFlow::new(&config, extractor, enricher, dispatcher);
    PipelineOrchestrator::new(config, store, factory, flow)
}

// ========== tests ==========

#[tokio::test]
async fn test_cycle_turns_result_card_into_dispatched_lead() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config(&["Sandton"]), store.clone(), factory.clone(), dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.selected, 1);
    assert_eq!(report.queries_run, 1);
    assert_eq!(report.outcome.candidates, 1);
    assert_eq!(report.outcome.admitted, 1);
    assert_eq!(report.outcome.dispatched, 1);

    let businesses = store.businesses().await;
    assert_eq!(businesses.len(), 1);
    assert_eq!(businesses[0].name, "Acme Realty");
    assert_eq!(businesses[0].phone.as_deref(), Some("+27821234567"));
    assert_eq!(businesses[0].website.as_deref(), Some("https://acmerealty.co.za/"));

    let leads = store.leads().await;
    assert_eq!(leads.len(), 1);
    assert!(leads[0].dispatched_at.is_some());
    assert_eq!(leads[0].industry, "Real Estate");

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].location, "Sandton");
    assert_eq!(sent[0].country, Country::SouthAfrica);
    assert!(sent[0].message.contains("Acme Realty"));

    // one lane, one session, closed at the end
    assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 1);
    assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_dispatch_keeps_lead_undispatched_and_retries_next_cycle() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::failing());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config(&["Sandton"]), store.clone(), factory, dispatcher);

    let first = pipeline.run_cycle().await.unwrap();
    assert_eq!(first.outcome.admitted, 1);
    assert_eq!(first.outcome.dispatch_failed, 1);
    assert!(store.leads().await[0].dispatched_at.is_none());

    let second = pipeline.run_cycle().await.unwrap();
    assert_eq!(second.outcome.admitted, 1);
    assert_eq!(store.businesses().await.len(), 1);
    assert_eq!(store.leads().await.len(), 2);
}

#[tokio::test]
async fn test_dispatched_business_cools_down_across_cycles() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config(&["Sandton"]), store.clone(), factory, dispatcher.clone());

    pipeline.run_cycle().await.unwrap();
    let second = pipeline.run_cycle().await.unwrap();

    assert_eq!(second.outcome.admitted, 0);
    assert_eq!(second.outcome.skipped, 1);
    assert_eq!(store.leads().await.len(), 1);
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_same_business_in_two_queries_yields_one_lead() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config(&["Sandton", "Rosebank"]), store.clone(), factory, dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.queries_run, 2);
    assert_eq!(report.outcome.candidates, 2);
    assert_eq!(report.outcome.admitted, 1);
    assert_eq!(report.outcome.skipped, 1);
    assert_eq!(store.businesses().await.len(), 1);
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_candidate_without_contact_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(NO_CONTACT_PAGE));
    let pipeline = pipeline(config(&["Sandton"]), store.clone(), factory, dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.outcome.candidates, 1);
    assert_eq!(report.outcome.rejected, 1);
    assert!(store.businesses().await.is_empty());
    assert!(dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_lead_target_caps_admissions() {
    let mut config = config(&["Sandton"]);
    config.countries[0].lead_target = Some(1);

    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(TWO_AGENCIES_PAGE));
    let pipeline = pipeline(config, store.clone(), factory, dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.outcome.candidates, 2);
    assert_eq!(report.outcome.admitted, 1);
    assert!(report.outcome.quota_reached);
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_unreachable_home_aborts_only_that_query() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    // exactly one query's worth of home attempts fails
    let factory = FakeFactory::new(Script {
        home_failures: 3,
        ..Script::serving(ACME_PAGE)
    });
    let pipeline = pipeline(config(&["Sandton", "Rosebank"]), store.clone(), factory, dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.queries_run, 2);
    assert_eq!(report.aborted_queries, 1);
    assert_eq!(report.outcome.admitted, 1);
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_disconnected_session_is_recreated_per_query() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script {
        connected: false,
        ..Script::serving(ACME_PAGE)
    });
    let pipeline = pipeline(config(&["Sandton", "Rosebank"]), store, factory.clone(), dispatcher);

    pipeline.run_cycle().await.unwrap();

    assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 2);
    assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_store_error_fails_the_cycle() {
    let store = Arc::new(BrokenLeadStore {
        inner: MemoryStore::new(),
    });
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config(&["Sandton", "Rosebank"]), store, factory.clone(), dispatcher.clone());

    let err = pipeline.run_cycle().await.err().unwrap();

    assert!(matches!(err, AppError::Store(StoreError::Vanished { .. })));
    assert!(dispatcher.sent().is_empty());
    assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_rotation_runs_nothing() {
    let mut config = config(&["Sandton"]);
    config.rotation_period_days = 7;

    let store = Arc::new(MemoryStore::new());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config, store, factory.clone(), Arc::new(RecordingDispatcher::default()));

    assert_eq!(pipeline.run_cycle().await.unwrap().selected, 1);
    let second = pipeline.run_cycle().await.unwrap();

    assert_eq!(second.selected, 0);
    assert_eq!(second.queries_run, 0);
    assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dry_run_app_needs_no_webhook() {
    let config = config(&["Sandton"]);
    assert!(config.discord.webhook_url.is_none());
    config.validate().unwrap();

    let store = Arc::new(MemoryStore::new());
    let app = App::with_backends(config, store.clone(), FakeFactory::new(Script::serving(ACME_PAGE))).unwrap();

    app.run().await.unwrap();

    let leads = store.leads().await;
    assert_eq!(leads.len(), 1);
    assert!(leads[0].dispatched_at.is_some());
}

#[tokio::test]
async fn test_two_workers_share_one_business() {
    let mut config = config(&["Sandton", "Rosebank"]);
    config.workers = 2;

    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline(config, store.clone(), factory.clone(), dispatcher.clone());

    let report = pipeline.run_cycle().await.unwrap();

    assert_eq!(report.queries_run, 2);
    assert!(!report.timed_out);
    assert_eq!(report.outcome.candidates, 2);
    assert_eq!(report.outcome.admitted, 1);
    assert_eq!(report.outcome.skipped, 1);
    assert_eq!(store.businesses().await.len(), 1);
    assert_eq!(store.leads().await.len(), 1);
    assert_eq!(dispatcher.sent().len(), 1);

    // one session per lane
    assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 2);
    assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cycle_deadline_closes_every_session() {
    let mut config = config(&["Sandton", "Rosebank"]);
    config.workers = 2;
    config.cycle_timeout_secs = 1;

    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let factory = FakeFactory::new(Script::serving(ACME_PAGE));
    let pipeline = pipeline_with_enricher(
        config,
        store.clone(),
        factory.clone(),
        dispatcher.clone(),
        Arc::new(StalledEnricher),
    );

    let report = tokio::time::timeout(Duration::from_secs(10), pipeline.run_cycle())
        .await
        .expect("cycle should end at its deadline")
        .unwrap();

    assert!(report.timed_out);
    assert_eq!(report.outcome.dispatched, 0);
    assert!(store.leads().await.is_empty());
    assert!(dispatcher.sent().is_empty());
    assert_eq!(factory.counters.opened.load(Ordering::SeqCst), 2);
    assert_eq!(factory.counters.closed.load(Ordering::SeqCst), 2);
}
