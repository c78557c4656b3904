use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Pool, Sqlite};
use std::str::FromStr;

use crate::models::{AlertRule, Notification};

pub type DbPool = Pool<Sqlite>;

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    title: String,
    message: String,
    notification_type: String,
    severity: String,
    timestamp: String,
    read: bool,
}

#[derive(FromRow)]
struct AlertRuleRow {
    id: String,
    name: String,
    description: String,
    resource: String,
    threshold: f64,
    severity: String,
    enabled: bool,
}

const NOTIFICATION_COLUMNS: &str =
    "id, title, message, notification_type, severity, timestamp, read";
const ALERT_RULE_COLUMNS: &str = "id, name, description, resource, threshold, severity, enabled";

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Create database file if it doesn't exist
        if !in_memory {
            let db_path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            if let Some(parent) = std::path::Path::new(db_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            if !std::path::Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        // every in-memory connection is its own database, so keep exactly one alive
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(database_url).await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // ==================== Notifications ====================

    /// List notifications, newest first
    pub async fn list_notifications(
        &self,
        unread_only: bool,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only { "WHERE read = 0" } else { "" };
        let query = format!(
            "SELECT {} FROM notifications {} ORDER BY timestamp DESC, rowid DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS, filter
        );

        let rows: Vec<NotificationRow> = sqlx::query_as(&query)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    pub async fn count_notifications(&self, unread_only: bool) -> Result<i64, sqlx::Error> {
        let query = if unread_only {
            "SELECT COUNT(*) FROM notifications WHERE read = 0"
        } else {
            "SELECT COUNT(*) FROM notifications"
        };
        let (count,): (i64,) = sqlx::query_as(query).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn create_notification(&self, notification: &Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, title, message, notification_type, severity, timestamp, read)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.to_string())
        .bind(notification.severity.to_string())
        .bind(format_timestamp(&notification.timestamp))
        .bind(notification.read)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE read = 0")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_notification(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Alert Rules ====================

    pub async fn list_alert_rules(&self) -> Result<Vec<AlertRule>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM alert_rules ORDER BY created_at, rowid",
            ALERT_RULE_COLUMNS
        );
        let rows: Vec<AlertRuleRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_alert_rule).collect()
    }

    pub async fn get_alert_rule(&self, id: &str) -> Result<Option<AlertRule>, sqlx::Error> {
        let query = format!("SELECT {} FROM alert_rules WHERE id = ?", ALERT_RULE_COLUMNS);
        let row: Option<AlertRuleRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_alert_rule).transpose()
    }

    pub async fn create_alert_rule(&self, rule: &AlertRule) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO alert_rules (id, name, description, resource, threshold, severity, enabled, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.resource.to_string())
        .bind(rule.threshold)
        .bind(rule.severity.to_string())
        .bind(rule.enabled)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update all editable fields. Returns false when the rule does not exist.
    pub async fn update_alert_rule(&self, rule: &AlertRule) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alert_rules SET
                name = ?,
                description = ?,
                resource = ?,
                threshold = ?,
                severity = ?,
                enabled = ?
             WHERE id = ?",
        )
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.resource.to_string())
        .bind(rule.threshold)
        .bind(rule.severity.to_string())
        .bind(rule.enabled)
        .bind(&rule.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip `enabled` and return the updated rule
    pub async fn toggle_alert_rule(&self, id: &str) -> Result<Option<AlertRule>, sqlx::Error> {
        let result = sqlx::query("UPDATE alert_rules SET enabled = NOT enabled WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_alert_rule(id).await
    }

    pub async fn delete_alert_rule(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alert_rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_notification(row: NotificationRow) -> Result<Notification, sqlx::Error> {
        Ok(Notification {
            id: row.id,
            title: row.title,
            message: row.message,
            notification_type: parse_column(&row.notification_type)?,
            severity: parse_column(&row.severity)?,
            timestamp: row
                .timestamp
                .parse::<DateTime<Utc>>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            read: row.read,
        })
    }

    fn row_to_alert_rule(row: AlertRuleRow) -> Result<AlertRule, sqlx::Error> {
        Ok(AlertRule {
            id: row.id,
            name: row.name,
            description: row.description,
            resource: parse_column(&row.resource)?,
            threshold: row.threshold,
            severity: parse_column(&row.severity)?,
            enabled: row.enabled,
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_column<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = strum::ParseError>,
{
    value
        .parse::<T>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertResource, AlertSeverity, NotificationSeverity};

    async fn test_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_database_connection() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let result = sqlx::query("SELECT 1").fetch_one(db.pool()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_default_alert_rules_seeded() {
        let db = test_db().await;
        let rules = db.list_alert_rules().await.unwrap();

        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].name, "High CPU Usage");
        assert_eq!(rules[0].resource, AlertResource::Cpu);
        assert_eq!(rules[1].severity, AlertSeverity::Critical);
        assert_eq!(rules[4].resource, AlertResource::Pods);
        assert!(rules.iter().all(|r| r.enabled));
    }

    #[tokio::test]
    async fn test_notification_lifecycle() {
        let db = test_db().await;
        let first = Notification::update("Cluster added", "dev", NotificationSeverity::Success);
        let second = Notification::alert("High CPU Usage", "node-1 at 75%", NotificationSeverity::Warning);
        db.create_notification(&first).await.unwrap();
        db.create_notification(&second).await.unwrap();

        assert_eq!(db.count_notifications(true).await.unwrap(), 2);
        let listed = db.list_notifications(false, 10, 0).await.unwrap();
        assert_eq!(listed[0].id, second.id);

        assert!(db.mark_notification_read(&first.id).await.unwrap());
        assert_eq!(db.count_notifications(true).await.unwrap(), 1);
        let unread = db.list_notifications(true, 10, 0).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, second.id);

        assert_eq!(db.mark_all_notifications_read().await.unwrap(), 1);
        assert!(db.delete_notification(&first.id).await.unwrap());
        assert!(!db.delete_notification(&first.id).await.unwrap());
        assert_eq!(db.count_notifications(false).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_toggle_alert_rule() {
        let db = test_db().await;
        let rule = db.toggle_alert_rule("high-cpu").await.unwrap().unwrap();
        assert!(!rule.enabled);
        let rule = db.toggle_alert_rule("high-cpu").await.unwrap().unwrap();
        assert!(rule.enabled);
        assert!(db.toggle_alert_rule("missing").await.unwrap().is_none());
    }
}
