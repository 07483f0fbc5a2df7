//! Lead and request operations for the repository.

use crate::domain::{
    Lead, LeadId, LeadStatus, ParentRef, ProfessionalId, Request, RequestId, TimeMs,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_enum, parse_opt_decimal, placeholders, Repository};

impl Repository {
    /// Insert a new lead.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate id).
    pub async fn insert_lead(&self, lead: &Lead) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO leads (
                id, owner_id, title, description, location, budget,
                referrer_share_pct, status, assigned_professional_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lead.id.as_str())
        .bind(lead.owner_id.as_str())
        .bind(&lead.title)
        .bind(&lead.description)
        .bind(&lead.location)
        .bind(lead.budget.map(|b| b.to_canonical_string()))
        .bind(lead.referrer_share_pct.map(i64::from))
        .bind(lead.status.as_str())
        .bind(lead.assigned_professional_id.as_ref().map(|p| p.as_str()))
        .bind(lead.created_at.as_ms())
        .bind(lead.updated_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, location, budget,
                   referrer_share_pct, status, assigned_professional_id, created_at, updated_at
            FROM leads
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| lead_from_row(&r)).transpose()
    }

    /// Insert a new request.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate id).
    pub async fn insert_request(&self, request: &Request) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                id, owner_id, title, description, location, status,
                assigned_professional_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.as_str())
        .bind(request.owner_id.as_str())
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.status.as_str())
        .bind(request.assigned_professional_id.as_ref().map(|p| p.as_str()))
        .bind(request.created_at.as_ms())
        .bind(request.updated_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<Option<Request>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, location, status,
                   assigned_professional_id, created_at, updated_at
            FROM requests
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| request_from_row(&r)).transpose()
    }

    /// Conditionally move a listing to `to`.
    ///
    /// Applies only while the current status is one of `from`. `assigned`
    /// overwrites the assigned professional when given.
    pub async fn update_listing_status(
        &self,
        parent: &ParentRef,
        from: &[LeadStatus],
        to: LeadStatus,
        assigned: Option<&ProfessionalId>,
    ) -> Result<bool, sqlx::Error> {
        let table = match parent {
            ParentRef::Lead(_) => "leads",
            ParentRef::Request(_) => "requests",
        };
        let sql = format!(
            r#"
            UPDATE {}
            SET status = ?,
                assigned_professional_id = COALESCE(?, assigned_professional_id),
                updated_at = ?
            WHERE id = ? AND status IN ({})
            "#,
            table,
            placeholders(from.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(assigned.map(|p| p.as_str()))
            .bind(TimeMs::now().as_ms())
            .bind(parent.id_str());
        for status in from {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let share: Option<i64> = row.try_get("referrer_share_pct")?;
    let referrer_share_pct = share
        .map(|s| u8::try_from(s).map_err(|e| super::decode_err("referrer share", &s.to_string(), e)))
        .transpose()?;

    Ok(Lead {
        id: LeadId::new(row.try_get::<String, _>("id")?),
        owner_id: ProfessionalId::new(row.try_get::<String, _>("owner_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        budget: parse_opt_decimal("budget", row.try_get("budget")?)?,
        referrer_share_pct,
        status: parse_enum("lead status", &status)?,
        assigned_professional_id: row
            .try_get::<Option<String>, _>("assigned_professional_id")?
            .map(ProfessionalId::new),
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

fn request_from_row(row: &SqliteRow) -> Result<Request, sqlx::Error> {
    let status: String = row.try_get("status")?;

    Ok(Request {
        id: RequestId::new(row.try_get::<String, _>("id")?),
        owner_id: ProfessionalId::new(row.try_get::<String, _>("owner_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        status: parse_enum("request status", &status)?,
        assigned_professional_id: row
            .try_get::<Option<String>, _>("assigned_professional_id")?
            .map(ProfessionalId::new),
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}
