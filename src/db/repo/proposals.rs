//! Proposal and quote operations for the repository.
//!
//! Leads and requests share one `proposals` table keyed by `(kind, id)`.

use crate::domain::{
    Decimal, ParentRef, ProfessionalId, Proposal, ProposalId, ProposalKind, ProposalStatus,
    TimeMs,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_enum, parse_opt_decimal, placeholders, Repository};

const PROPOSAL_COLUMNS: &str = "kind, id, parent_id, professional_id, price, description, status, \
                                scheduled_at, final_amount, created_at, updated_at";

/// Statuses after which a professional may bid again on the same listing.
const TERMINAL: [ProposalStatus; 3] = [
    ProposalStatus::Completed,
    ProposalStatus::Cancelled,
    ProposalStatus::Rejected,
];

impl Repository {
    /// Insert a proposal unless the submitter already has an open one on the
    /// same listing.
    ///
    /// Returns `Ok(false)` on that conflict. A duplicate `(kind, id)` surfaces
    /// as a unique violation.
    pub async fn insert_proposal(&self, proposal: &Proposal) -> Result<bool, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO proposals ({})
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM proposals
                WHERE kind = ? AND parent_id = ? AND professional_id = ?
                  AND status NOT IN ({})
            )
            "#,
            PROPOSAL_COLUMNS,
            placeholders(TERMINAL.len())
        );

        let kind = proposal.kind().as_str();
        let mut query = sqlx::query(&sql)
            .bind(kind)
            .bind(proposal.id.as_str())
            .bind(proposal.parent.id_str())
            .bind(proposal.professional_id.as_str())
            .bind(proposal.price.map(|p| p.to_canonical_string()))
            .bind(&proposal.description)
            .bind(proposal.status.as_str())
            .bind(proposal.scheduled_at.map(|t| t.as_ms()))
            .bind(proposal.final_amount.map(|a| a.to_canonical_string()))
            .bind(proposal.created_at.as_ms())
            .bind(proposal.updated_at.as_ms())
            .bind(kind)
            .bind(proposal.parent.id_str())
            .bind(proposal.professional_id.as_str());
        for status in TERMINAL {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
    ) -> Result<Option<Proposal>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM proposals WHERE kind = ? AND id = ?",
            PROPOSAL_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| proposal_from_row(&r)).transpose()
    }

    /// All proposals on a listing, oldest first.
    pub async fn list_proposals(&self, parent: &ParentRef) -> Result<Vec<Proposal>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM proposals WHERE kind = ? AND parent_id = ? ORDER BY created_at ASC, rowid ASC",
            PROPOSAL_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(parent.kind().as_str())
            .bind(parent.id_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(proposal_from_row).collect()
    }

    pub async fn update_proposal_status(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE proposals
            SET status = ?, updated_at = ?
            WHERE kind = ? AND id = ? AND status IN ({})
            "#,
            placeholders(from.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(TimeMs::now().as_ms())
            .bind(kind.as_str())
            .bind(id.as_str());
        for status in from {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Award a proposal in one statement.
    ///
    /// The correlated `NOT EXISTS` keeps the sibling check and the write in a
    /// single SQLite statement, so two concurrent awards on one listing cannot
    /// both succeed.
    pub async fn award_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        to: ProposalStatus,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE proposals
            SET status = ?, updated_at = ?
            WHERE kind = ? AND id = ? AND status IN ({})
              AND NOT EXISTS (
                SELECT 1 FROM proposals AS sibling
                WHERE sibling.kind = proposals.kind
                  AND sibling.parent_id = proposals.parent_id
                  AND sibling.id <> proposals.id
                  AND sibling.status IN ({})
              )
            "#,
            placeholders(from.len()),
            placeholders(ProposalStatus::AWARDED.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(TimeMs::now().as_ms())
            .bind(kind.as_str())
            .bind(id.as_str());
        for status in from {
            query = query.bind(status.as_str());
        }
        for status in ProposalStatus::AWARDED {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn schedule_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        scheduled_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE proposals
            SET status = ?, scheduled_at = ?, updated_at = ?
            WHERE kind = ? AND id = ? AND status IN ({})
            "#,
            placeholders(from.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(ProposalStatus::Scheduled.as_str())
            .bind(scheduled_at.as_ms())
            .bind(TimeMs::now().as_ms())
            .bind(kind.as_str())
            .bind(id.as_str());
        for status in from {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn complete_proposal(
        &self,
        kind: ProposalKind,
        id: &ProposalId,
        from: &[ProposalStatus],
        final_amount: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE proposals
            SET status = ?, final_amount = ?, updated_at = ?
            WHERE kind = ? AND id = ? AND status IN ({})
            "#,
            placeholders(from.len())
        );

        let mut query = sqlx::query(&sql)
            .bind(ProposalStatus::Completed.as_str())
            .bind(final_amount.to_canonical_string())
            .bind(TimeMs::now().as_ms())
            .bind(kind.as_str())
            .bind(id.as_str());
        for status in from {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn proposal_from_row(row: &SqliteRow) -> Result<Proposal, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let kind: ProposalKind = parse_enum("proposal kind", &kind)?;
    let status: String = row.try_get("status")?;

    Ok(Proposal {
        id: ProposalId::new(row.try_get::<String, _>("id")?),
        parent: ParentRef::from_parts(kind, row.try_get::<String, _>("parent_id")?),
        professional_id: ProfessionalId::new(row.try_get::<String, _>("professional_id")?),
        price: parse_opt_decimal("price", row.try_get("price")?)?,
        description: row.try_get("description")?,
        status: parse_enum("proposal status", &status)?,
        scheduled_at: row
            .try_get::<Option<i64>, _>("scheduled_at")?
            .map(TimeMs::new),
        final_amount: parse_opt_decimal("final amount", row.try_get("final_amount")?)?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}
