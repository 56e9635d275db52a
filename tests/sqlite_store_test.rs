//! SQLite store behaviour on an in-memory database

use chrono::{Duration, TimeZone, Utc};
use lead_engine::models::{BusinessCriteria, NewBusiness, NewLead};
use lead_engine::{LeadStore, SqliteStore};

async fn store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:").await.unwrap()
}

fn business(name: &str, phone: Option<&str>, website: Option<&str>) -> NewBusiness {
    NewBusiness {
        name: name.to_string(),
        phone: phone.map(str::to_string),
        website: website.map(str::to_string),
        created_at: Utc::now(),
    }
}

fn lead(business_id: i64, created_at: chrono::DateTime<Utc>) -> NewLead {
    NewLead {
        business_id,
        industry: "Real Estate".to_string(),
        pain_point: "Missed calls".to_string(),
        recommended_solution: "Call answering".to_string(),
        message: "Hi".to_string(),
        created_at,
    }
}

#[tokio::test]
async fn test_create_business_is_idempotent_on_identity() {
    let store = store().await;

    let first = store
        .create_business(&business("Acme Realty", Some("+27821234567"), None))
        .await
        .unwrap();
    let again = store
        .create_business(&business("Acme Realty", Some("+27821234567"), None))
        .await
        .unwrap();
    let other = store
        .create_business(&business("Acme Realty", None, Some("https://acme.co.za/")))
        .await
        .unwrap();

    assert_eq!(first.id, again.id);
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn test_find_business_by_each_criteria() {
    let store = store().await;
    let created = store
        .create_business(&business("Acme Realty", Some("+27821234567"), Some("https://acme.co.za/")))
        .await
        .unwrap();

    let by_phone = store
        .find_business(&BusinessCriteria::NameAndPhone {
            name: "Acme Realty".to_string(),
            phone: "+27821234567".to_string(),
        })
        .await
        .unwrap();
    let by_website = store
        .find_business(&BusinessCriteria::NameAndWebsite {
            name: "Acme Realty".to_string(),
            website: "https://acme.co.za/".to_string(),
        })
        .await
        .unwrap();
    let by_name = store
        .find_business(&BusinessCriteria::Name("Acme Realty".to_string()))
        .await
        .unwrap();
    let missing = store
        .find_business(&BusinessCriteria::NameAndPhone {
            name: "Acme Realty".to_string(),
            phone: "+263771234567".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(by_phone.map(|b| b.id), Some(created.id));
    assert_eq!(by_website.map(|b| b.id), Some(created.id));
    assert_eq!(by_name.map(|b| b.id), Some(created.id));
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_latest_lead_and_dispatch_mark() {
    let store = store().await;
    let b = store
        .create_business(&business("Acme Realty", Some("+27821234567"), None))
        .await
        .unwrap();

    let now = Utc::now();
    store.create_lead(&lead(b.id, now - Duration::days(40))).await.unwrap();
    let newest = store.create_lead(&lead(b.id, now)).await.unwrap();
    assert!(newest.dispatched_at.is_none());

    store.mark_dispatched(newest.id, now).await.unwrap();

    let latest = store.find_latest_lead(b.id).await.unwrap().unwrap();
    assert_eq!(latest.id, newest.id);
    assert!(latest.dispatched_at.is_some());
}

#[tokio::test]
async fn test_rotation_upsert_overwrites_timestamp() {
    let store = store().await;
    let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 1, 9, 8, 0, 0).unwrap();

    assert!(store.find_rotation("Sandton", "Plumbers").await.unwrap().is_none());

    store
        .upsert_rotation("Sandton", "Plumbers", "Plumbers in Sandton", earlier)
        .await
        .unwrap();
    store
        .upsert_rotation("Sandton", "Plumbers", "Best Plumbers near Sandton", later)
        .await
        .unwrap();

    let record = store.find_rotation("Sandton", "Plumbers").await.unwrap().unwrap();
    assert_eq!(record.last_queried_at, later);
    assert_eq!(record.query, "Best Plumbers near Sandton");
}

#[tokio::test]
async fn test_purge_drops_stale_rows_only() {
    let store = store().await;
    let now = Utc::now();
    let cutoff = now - Duration::days(90);

    let stale = store
        .create_business(&NewBusiness {
            created_at: now - Duration::days(200),
            ..business("Old Co", Some("+27110000000"), None)
        })
        .await
        .unwrap();
    store.create_lead(&lead(stale.id, now - Duration::days(120))).await.unwrap();

    let fresh = store
        .create_business(&business("New Co", Some("+27119999999"), None))
        .await
        .unwrap();
    store.create_lead(&lead(fresh.id, now)).await.unwrap();

    store
        .upsert_rotation("Sandton", "Plumbers", "Plumbers in Sandton", now - Duration::days(100))
        .await
        .unwrap();
    store
        .upsert_rotation("Rosebank", "Plumbers", "Plumbers in Rosebank", now)
        .await
        .unwrap();

    let report = store.purge_older_than(cutoff).await.unwrap();

    assert_eq!(report.leads, 1);
    assert_eq!(report.businesses, 1);
    assert_eq!(report.rotations, 1);
    assert!(store.find_latest_lead(fresh.id).await.unwrap().is_some());
    assert!(store.find_rotation("Rosebank", "Plumbers").await.unwrap().is_some());
    assert!(store.find_rotation("Sandton", "Plumbers").await.unwrap().is_none());
}
