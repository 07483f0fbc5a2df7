//! Notification operations for the repository.

use crate::domain::{Notification, NotificationId, ProfessionalId, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_enum, Repository};

impl Repository {
    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, professional_id, title, description, notification_type,
                related_id, related_type, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.id.as_str())
        .bind(notification.professional_id.as_str())
        .bind(&notification.title)
        .bind(&notification.description)
        .bind(notification.notification_type.as_str())
        .bind(&notification.related_id)
        .bind(notification.related_type.as_str())
        .bind(notification.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent notifications for one professional, newest first.
    pub async fn list_notifications(
        &self,
        professional_id: &ProfessionalId,
        limit: u32,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, professional_id, title, description, notification_type,
                   related_id, related_type, created_at
            FROM notifications
            WHERE professional_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(professional_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, sqlx::Error> {
    let notification_type: String = row.try_get("notification_type")?;
    let related_type: String = row.try_get("related_type")?;

    Ok(Notification {
        id: NotificationId::new(row.try_get::<String, _>("id")?),
        professional_id: ProfessionalId::new(row.try_get::<String, _>("professional_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        notification_type: parse_enum("notification type", &notification_type)?,
        related_id: row.try_get("related_id")?,
        related_type: parse_enum("related type", &related_type)?,
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}
