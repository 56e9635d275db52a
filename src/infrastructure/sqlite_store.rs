//! SQLite-backed [`LeadStore`]

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::store::LeadStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    BusinessCriteria, BusinessRecord, LeadRecord, NewBusiness, NewLead, PurgeReport,
    RotationRecord,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS businesses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        website TEXT,
        phone TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    // NULLs never collide in a plain UNIQUE constraint
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_businesses_identity
        ON businesses (name, IFNULL(phone, ''), IFNULL(website, ''))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        business_id INTEGER NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
        industry TEXT NOT NULL,
        pain_point TEXT NOT NULL,
        recommended_solution TEXT NOT NULL,
        message TEXT NOT NULL,
        dispatched_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_leads_business ON leads (business_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS query_rotations (
        location TEXT NOT NULL,
        industry TEXT NOT NULL,
        query TEXT NOT NULL,
        last_queried_at TEXT NOT NULL,
        PRIMARY KEY (location, industry)
    )
    "#,
];

const BUSINESS_COLUMNS: &str = "id, name, website, phone, created_at";
const LEAD_COLUMNS: &str =
    "id, business_id, industry, pain_point, recommended_solution, message, dispatched_at, created_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and apply the schema
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            ensure_parent_dir(database_url)?;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // an in-memory database lives and dies with its single connection
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("✓ Connected to {}", database_url);
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema ready");
        Ok(())
    }

    async fn find_business_identity(&self, data: &NewBusiness) -> StoreResult<Option<BusinessRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM businesses
             WHERE name = ? AND IFNULL(phone, '') = IFNULL(?, '') AND IFNULL(website, '') = IFNULL(?, '')",
            BUSINESS_COLUMNS
        ))
        .bind(&data.name)
        .bind(&data.phone)
        .bind(&data.website)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| business_from_row(&r)).transpose()
    }
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn find_business(&self, criteria: &BusinessCriteria) -> StoreResult<Option<BusinessRecord>> {
        let query = match criteria {
            BusinessCriteria::NameAndPhone { .. } => "WHERE name = ? AND phone = ?",
            BusinessCriteria::NameAndWebsite { .. } => "WHERE name = ? AND website = ?",
            BusinessCriteria::Name(_) => "WHERE name = ?",
        };
        let sql = format!(
            "SELECT {} FROM businesses {} ORDER BY id LIMIT 1",
            BUSINESS_COLUMNS, query
        );

        let query = match criteria {
            BusinessCriteria::NameAndPhone { name, phone } => sqlx::query(&sql).bind(name).bind(phone),
            BusinessCriteria::NameAndWebsite { name, website } => {
                sqlx::query(&sql).bind(name).bind(website)
            }
            BusinessCriteria::Name(name) => sqlx::query(&sql).bind(name),
        };

        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| business_from_row(&r)).transpose()
    }

    async fn create_business(&self, data: &NewBusiness) -> StoreResult<BusinessRecord> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO businesses (name, website, phone, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(&data.website)
        .bind(&data.phone)
        .bind(data.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Business '{}' already exists, re-fetching", data.name);
        }
        self.find_business_identity(data)
            .await?
            .ok_or(StoreError::Vanished { entity: "business" })
    }

    async fn find_latest_lead(&self, business_id: i64) -> StoreResult<Option<LeadRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM leads WHERE business_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            LEAD_COLUMNS
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| lead_from_row(&r)).transpose()
    }

    async fn create_lead(&self, data: &NewLead) -> StoreResult<LeadRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO leads (business_id, industry, pain_point, recommended_solution, message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.business_id)
        .bind(&data.industry)
        .bind(&data.pain_point)
        .bind(&data.recommended_solution)
        .bind(&data.message)
        .bind(data.created_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS))
            .bind(result.last_insert_rowid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::Vanished { entity: "lead" })?;
        lead_from_row(&row)
    }

    async fn mark_dispatched(&self, lead_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE leads SET dispatched_at = ? WHERE id = ?")
            .bind(at)
            .bind(lead_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Vanished { entity: "lead" });
        }
        Ok(())
    }

    async fn upsert_rotation(
        &self,
        location: &str,
        industry: &str,
        query: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO query_rotations (location, industry, query, last_queried_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (location, industry)
            DO UPDATE SET query = excluded.query, last_queried_at = excluded.last_queried_at
            "#,
        )
        .bind(location)
        .bind(industry)
        .bind(query)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_rotation(&self, location: &str, industry: &str) -> StoreResult<Option<RotationRecord>> {
        let row = sqlx::query(
            "SELECT location, industry, query, last_queried_at FROM query_rotations
             WHERE location = ? AND industry = ?",
        )
        .bind(location)
        .bind(industry)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> StoreResult<RotationRecord> {
            Ok(RotationRecord {
                location: r.try_get("location")?,
                industry: r.try_get("industry")?,
                query: r.try_get("query")?,
                last_queried_at: r.try_get("last_queried_at")?,
            })
        })
        .transpose()
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<PurgeReport> {
        let leads = sqlx::query("DELETE FROM leads WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let businesses = sqlx::query(
            r#"
            DELETE FROM businesses
            WHERE created_at < ?
              AND NOT EXISTS (SELECT 1 FROM leads WHERE leads.business_id = businesses.id)
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let rotations = sqlx::query("DELETE FROM query_rotations WHERE last_queried_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(PurgeReport {
            leads,
            businesses,
            rotations,
        })
    }
}

fn business_from_row(row: &SqliteRow) -> StoreResult<BusinessRecord> {
    Ok(BusinessRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        website: row.try_get("website")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn lead_from_row(row: &SqliteRow) -> StoreResult<LeadRecord> {
    Ok(LeadRecord {
        id: row.try_get("id")?,
        business_id: row.try_get("business_id")?,
        industry: row.try_get("industry")?,
        pain_point: row.try_get("pain_point")?,
        recommended_solution: row.try_get("recommended_solution")?,
        message: row.try_get("message")?,
        dispatched_at: row.try_get("dispatched_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Create the directory of a file-backed database
fn ensure_parent_dir(database_url: &str) -> StoreResult<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Location {
            path: dir.display().to_string(),
            source,
        })?;
    }
    Ok(())
}
