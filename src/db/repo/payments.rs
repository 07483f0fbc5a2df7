//! Payment record operations for the repository.

use crate::domain::{PaymentId, PaymentRecord, ProfessionalId, ProposalId, ProposalKind, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_decimal, parse_enum, Repository};

impl Repository {
    /// Insert a payment record.
    ///
    /// # Errors
    /// A second payment for the same `(kind, proposal_id)` violates the
    /// unique constraint.
    pub async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, kind, proposal_id, professional_id, final_amount, payment_method,
                referrer_share_pct, platform_commission, referrer_commission,
                professional_net, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.as_str())
        .bind(payment.kind.as_str())
        .bind(payment.proposal_id.as_str())
        .bind(payment.professional_id.as_str())
        .bind(payment.final_amount.to_canonical_string())
        .bind(&payment.payment_method)
        .bind(payment.referrer_share_pct.to_canonical_string())
        .bind(payment.platform_commission.to_canonical_string())
        .bind(payment.referrer_commission.to_canonical_string())
        .bind(payment.professional_net.to_canonical_string())
        .bind(payment.notes.as_deref())
        .bind(payment.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_payment_for_proposal(
        &self,
        kind: ProposalKind,
        proposal_id: &ProposalId,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, proposal_id, professional_id, final_amount, payment_method,
                   referrer_share_pct, platform_commission, referrer_commission,
                   professional_net, notes, created_at
            FROM payments
            WHERE kind = ? AND proposal_id = ?
            "#,
        )
        .bind(kind.as_str())
        .bind(proposal_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| payment_from_row(&r)).transpose()
    }
}

fn payment_from_row(row: &SqliteRow) -> Result<PaymentRecord, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let final_amount: String = row.try_get("final_amount")?;
    let share: String = row.try_get("referrer_share_pct")?;
    let platform: String = row.try_get("platform_commission")?;
    let referrer: String = row.try_get("referrer_commission")?;
    let net: String = row.try_get("professional_net")?;

    Ok(PaymentRecord {
        id: PaymentId::new(row.try_get::<String, _>("id")?),
        proposal_id: ProposalId::new(row.try_get::<String, _>("proposal_id")?),
        kind: parse_enum("proposal kind", &kind)?,
        professional_id: ProfessionalId::new(row.try_get::<String, _>("professional_id")?),
        final_amount: parse_decimal("final amount", &final_amount)?,
        payment_method: row.try_get("payment_method")?,
        referrer_share_pct: parse_decimal("referrer share", &share)?,
        platform_commission: parse_decimal("platform commission", &platform)?,
        referrer_commission: parse_decimal("referrer commission", &referrer)?,
        professional_net: parse_decimal("professional net", &net)?,
        notes: row.try_get("notes")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::super::is_unique_violation;
    use super::super::test_support::setup_repo;
    use super::*;
    use crate::domain::Decimal;

    fn payment(id: &str, proposal: &str) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(id),
            proposal_id: ProposalId::new(proposal),
            kind: ProposalKind::Lead,
            professional_id: ProfessionalId::new("pro-a"),
            final_amount: Decimal::from_str_canonical("1000").unwrap(),
            payment_method: "bank_transfer".into(),
            referrer_share_pct: Decimal::from(10u8),
            platform_commission: Decimal::from_str_canonical("50.00").unwrap(),
            referrer_commission: Decimal::from_str_canonical("100.00").unwrap(),
            professional_net: Decimal::from_str_canonical("850.00").unwrap(),
            notes: Some("paid on site".into()),
            created_at: TimeMs::new(42),
        }
    }

    #[tokio::test]
    async fn test_payment_roundtrip_is_exact() {
        let (repo, _temp) = setup_repo().await;
        let record = payment("pay1", "p1");
        repo.insert_payment(&record).await.unwrap();

        let loaded = repo
            .get_payment_for_proposal(ProposalKind::Lead, &ProposalId::new("p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.platform_commission.to_currency_string(), "50.00");
    }

    #[tokio::test]
    async fn test_second_payment_for_proposal_is_unique_violation() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_payment(&payment("pay1", "p1")).await.unwrap();

        let err = repo.insert_payment(&payment("pay2", "p1")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_payment_lookup_is_scoped_by_kind() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_payment(&payment("pay1", "p1")).await.unwrap();
        assert!(repo
            .get_payment_for_proposal(ProposalKind::Request, &ProposalId::new("p1"))
            .await
            .unwrap()
            .is_none());
    }
}
