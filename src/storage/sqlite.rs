//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Probe commits from many tasks share one pool
//! - **Migrations**: Automatic schema versioning with sqlx
//! - **Atomic commits**: Device status update and log append share one transaction

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use crate::device::{Device, LogEntry, Template};

use super::backend::{HealthStatus, StorageBackend, new_id};
use super::error::{StorageError, StorageResult};
use super::schema::{
    CheckColumns, DeviceRow, TemplateRow, millis_to_timestamp, timestamp_to_millis,
};

const CHECK_COLUMNS: &str = "request_type, method, url_or_host, port, headers_json, body_json, \
                             payload, every, unit, matchers_json";

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for concurrent access (WAL mode, busy timeout)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use probewatch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./probewatch.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn bind_check<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        check: &'q CheckColumns,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&check.request_type)
            .bind(&check.method)
            .bind(&check.url_or_host)
            .bind(check.port)
            .bind(&check.headers_json)
            .bind(&check.body_json)
            .bind(&check.payload)
            .bind(check.every)
            .bind(&check.unit)
            .bind(&check.matchers_json)
    }

    fn check_from_row(row: &SqliteRow) -> CheckColumns {
        CheckColumns {
            request_type: row.get("request_type"),
            method: row.get("method"),
            url_or_host: row.get("url_or_host"),
            port: row.get("port"),
            headers_json: row.get("headers_json"),
            body_json: row.get("body_json"),
            payload: row.get("payload"),
            every: row.get("every"),
            unit: row.get("unit"),
            matchers_json: row.get("matchers_json"),
        }
    }

    fn device_from_row(row: &SqliteRow) -> Device {
        DeviceRow {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            image_url: row.get("image_url"),
            enabled: row.get("enabled"),
            template_id: row.get("template_id"),
            check: Self::check_from_row(row),
            last_checked_at: row.get("last_checked_at"),
            last_message: row.get("last_message"),
            last_color: row.get("last_color"),
            created_at: row.get("created_at"),
        }
        .into_device()
    }

    async fn select_devices(&self, enabled_only: bool) -> StorageResult<Vec<Device>> {
        let filter = if enabled_only { "WHERE enabled = 1" } else { "" };
        let sql = format!(
            r#"
            SELECT id, name, description, image_url, enabled, template_id, {CHECK_COLUMNS},
                   last_checked_at, last_message, last_color, created_at
            FROM devices
            {filter}
            ORDER BY created_at DESC, id ASC
            "#
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::device_from_row).collect())
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self))]
    async fn list_devices(&self) -> StorageResult<Vec<Device>> {
        self.select_devices(false).await
    }

    #[instrument(skip(self))]
    async fn list_enabled(&self) -> StorageResult<Vec<Device>> {
        self.select_devices(true).await
    }

    #[instrument(skip(self))]
    async fn get_device(&self, id: &str) -> StorageResult<Option<Device>> {
        let sql = format!(
            r#"
            SELECT id, name, description, image_url, enabled, template_id, {CHECK_COLUMNS},
                   last_checked_at, last_message, last_color, created_at
            FROM devices
            WHERE id = ?
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::device_from_row))
    }

    #[instrument(skip(self, device), fields(id = %device.id))]
    async fn upsert_device(&self, mut device: Device) -> StorageResult<Device> {
        if device.id.is_empty() {
            device.id = new_id();
        }

        let row = DeviceRow::from_device(&device)?;
        let sql = format!(
            r#"
            INSERT INTO devices (
                id, name, description, image_url, enabled, template_id, {CHECK_COLUMNS},
                last_checked_at, last_message, last_color, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                image_url = excluded.image_url,
                enabled = excluded.enabled,
                template_id = excluded.template_id,
                request_type = excluded.request_type,
                method = excluded.method,
                url_or_host = excluded.url_or_host,
                port = excluded.port,
                headers_json = excluded.headers_json,
                body_json = excluded.body_json,
                payload = excluded.payload,
                every = excluded.every,
                unit = excluded.unit,
                matchers_json = excluded.matchers_json,
                last_checked_at = excluded.last_checked_at,
                last_message = excluded.last_message,
                last_color = excluded.last_color
            "#
        );

        let query = sqlx::query(&sql)
            .bind(&row.id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.image_url)
            .bind(row.enabled)
            .bind(&row.template_id);
        Self::bind_check(query, &row.check)
            .bind(row.last_checked_at)
            .bind(&row.last_message)
            .bind(&row.last_color)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;

        debug!("device upserted");
        self.get_device(&device.id)
            .await?
            .ok_or_else(|| StorageError::NotFound(device.id.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_device(&self, id: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        let logs = sqlx::query("DELETE FROM probe_logs WHERE device_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let devices = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "deleted {} device rows and {} log entries",
            devices.rows_affected(),
            logs.rows_affected()
        );
        Ok(devices.rows_affected() > 0)
    }

    #[instrument(skip(self, entry), fields(device_id = %entry.device_id, ok = entry.ok))]
    async fn commit_outcome(&self, entry: &LogEntry) -> StorageResult<()> {
        let timestamp = timestamp_to_millis(&entry.timestamp);

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE devices
            SET last_checked_at = ?, last_message = ?, last_color = ?
            WHERE id = ?
            "#,
        )
        .bind(timestamp)
        .bind(&entry.message)
        .bind(&entry.color)
        .bind(&entry.device_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::NotFound(entry.device_id.clone()));
        }

        // Dropping the transaction on error rolls the device update back
        sqlx::query(
            r#"
            INSERT INTO probe_logs (device_id, timestamp, ok, message, color)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.device_id)
        .bind(timestamp)
        .bind(entry.ok)
        .bind(&entry.message)
        .bind(&entry.color)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_logs(&self, device_id: &str, limit: usize) -> StorageResult<Vec<LogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, device_id, timestamp, ok, message, color
            FROM probe_logs
            WHERE device_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(device_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut entries: Vec<LogEntry> = rows
            .iter()
            .map(|row| LogEntry {
                id: Some(row.get::<i64, _>("id").to_string()),
                device_id: row.get("device_id"),
                timestamp: millis_to_timestamp(row.get("timestamp")),
                ok: row.get("ok"),
                message: row.get("message"),
                color: row.get("color"),
            })
            .collect();

        // Oldest first
        entries.reverse();
        Ok(entries)
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_old_logs(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        info!("cleaning up log entries older than {}", before);

        let result = sqlx::query("DELETE FROM probe_logs WHERE timestamp < ?")
            .bind(timestamp_to_millis(&before))
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() as usize;
        info!("deleted {} old log entries", deleted);

        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_templates(&self) -> StorageResult<Vec<Template>> {
        let sql = format!(
            r#"
            SELECT id, name, description, {CHECK_COLUMNS}, created_at
            FROM templates
            ORDER BY created_at DESC, id ASC
            "#
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                TemplateRow {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    check: Self::check_from_row(row),
                    created_at: row.get("created_at"),
                }
                .into_template()
            })
            .collect())
    }

    #[instrument(skip(self, template), fields(name = %template.name))]
    async fn create_template(&self, mut template: Template) -> StorageResult<Template> {
        if template.id.is_empty() {
            template.id = new_id();
        }

        let row = TemplateRow::from_template(&template)?;
        let sql = format!(
            r#"
            INSERT INTO templates (id, name, description, {CHECK_COLUMNS}, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        );

        let query = sqlx::query(&sql)
            .bind(&row.id)
            .bind(&row.name)
            .bind(&row.description);
        Self::bind_check(query, &row.check)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;

        Ok(template)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
