//! Three-way money split for settled work.
//!
//! Platform and referrer commissions are rounded to currency precision and
//! the professional receives the remainder, so
//! `platform + referrer + professional == final_amount` holds exactly.

use crate::domain::{Decimal, ProposalKind};
use serde::Serialize;
use thiserror::Error;

/// Business rates, in percent. The single place these numbers live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionRates {
    pub lead_platform_pct: Decimal,
    pub request_platform_pct: Decimal,
    /// Applied to leads whose stored share is missing (legacy rows).
    pub default_referrer_share_pct: u8,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            lead_platform_pct: Decimal::from(5u8),
            request_platform_pct: Decimal::from(10u8),
            default_referrer_share_pct: 5,
        }
    }
}

impl CommissionRates {
    pub fn platform_pct(&self, kind: ProposalKind) -> Decimal {
        match kind {
            ProposalKind::Lead => self.lead_platform_pct,
            ProposalKind::Request => self.request_platform_pct,
        }
    }

    /// Referrer share for a lead, falling back to the default when unset.
    pub fn resolve_referrer_share(&self, stored: Option<u8>) -> Decimal {
        Decimal::from(stored.unwrap_or(self.default_referrer_share_pct))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommissionError {
    #[error("final amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("referrer share must be between 0 and 100, got {0}")]
    ShareOutOfRange(Decimal),
}

/// Result of splitting a final amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSplit {
    pub final_amount: Decimal,
    /// Share actually applied; always 0 for requests.
    pub referrer_share_pct: Decimal,
    pub platform_commission: Decimal,
    pub referrer_commission: Decimal,
    pub professional_net: Decimal,
}

impl CommissionSplit {
    pub fn total(&self) -> Decimal {
        self.platform_commission + self.referrer_commission + self.professional_net
    }
}

/// Pure calculator over a fixed rate table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionCalculator {
    rates: CommissionRates,
}

impl CommissionCalculator {
    pub fn new(rates: CommissionRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &CommissionRates {
        &self.rates
    }

    /// Split `final_amount` between platform, referrer and professional.
    ///
    /// `referrer_share_pct` is ignored for requests, which carry no referrer.
    ///
    /// # Errors
    /// `NegativeAmount` for amounts below zero, `ShareOutOfRange` for shares
    /// outside `[0, 100]` (checked for both kinds).
    pub fn split(
        &self,
        final_amount: Decimal,
        referrer_share_pct: Decimal,
        kind: ProposalKind,
    ) -> Result<CommissionSplit, CommissionError> {
        if final_amount.is_negative() {
            return Err(CommissionError::NegativeAmount(final_amount));
        }
        if referrer_share_pct.is_negative() || referrer_share_pct > Decimal::hundred() {
            return Err(CommissionError::ShareOutOfRange(referrer_share_pct));
        }

        let applied_share = match kind {
            ProposalKind::Lead => referrer_share_pct,
            ProposalKind::Request => Decimal::zero(),
        };

        let platform_rate = self.rates.platform_pct(kind).percent_to_rate();
        let platform_commission = (final_amount * platform_rate).round_currency();
        let referrer_commission = (final_amount * applied_share.percent_to_rate()).round_currency();
        let professional_net = final_amount - platform_commission - referrer_commission;

        Ok(CommissionSplit {
            final_amount,
            referrer_share_pct: applied_share,
            platform_commission,
            referrer_commission,
            professional_net,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_lead_split_with_referrer_share() {
        let calc = CommissionCalculator::default();
        let split = calc.split(d("1000"), d("15"), ProposalKind::Lead).unwrap();
        assert_eq!(split.platform_commission, d("50.00"));
        assert_eq!(split.referrer_commission, d("150.00"));
        assert_eq!(split.professional_net, d("800.00"));
    }

    #[test]
    fn test_request_split_ignores_referrer_share() {
        let calc = CommissionCalculator::default();
        let split = calc.split(d("500"), d("40"), ProposalKind::Request).unwrap();
        assert_eq!(split.platform_commission, d("50.00"));
        assert_eq!(split.referrer_commission, Decimal::zero());
        assert_eq!(split.referrer_share_pct, Decimal::zero());
        assert_eq!(split.professional_net, d("450.00"));
    }

    #[test]
    fn test_split_identity_holds_across_awkward_amounts() {
        let calc = CommissionCalculator::default();
        let amounts = ["0", "0.01", "0.07", "1", "33.33", "99.99", "123.456", "1000000.01"];
        let shares = ["0", "1", "5", "15", "33", "50", "99", "100"];

        for amount in amounts {
            for share in shares {
                for kind in [ProposalKind::Lead, ProposalKind::Request] {
                    let split = calc.split(d(amount), d(share), kind).unwrap();
                    assert_eq!(
                        split.total(),
                        d(amount),
                        "identity broken for amount={} share={} kind={}",
                        amount,
                        share,
                        kind
                    );
                }
            }
        }
    }

    #[test]
    fn test_rounding_keeps_commissions_at_currency_precision() {
        let calc = CommissionCalculator::default();
        let split = calc.split(d("33.33"), d("15"), ProposalKind::Lead).unwrap();
        // 33.33 * 5% = 1.6665 -> 1.67, 33.33 * 15% = 4.9995 -> 5.00
        assert_eq!(split.platform_commission, d("1.67"));
        assert_eq!(split.referrer_commission, d("5.00"));
        assert_eq!(split.professional_net, d("26.66"));
    }

    #[test]
    fn test_zero_share_lead() {
        let calc = CommissionCalculator::default();
        let split = calc.split(d("200"), Decimal::zero(), ProposalKind::Lead).unwrap();
        assert!(split.referrer_commission.is_zero());
        assert_eq!(split.professional_net, d("190"));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let calc = CommissionCalculator::default();
        let err = calc.split(d("-1"), d("5"), ProposalKind::Lead).unwrap_err();
        assert_eq!(err, CommissionError::NegativeAmount(d("-1")));
    }

    #[test]
    fn test_share_out_of_range_rejected() {
        let calc = CommissionCalculator::default();
        assert!(matches!(
            calc.split(d("10"), d("100.5"), ProposalKind::Lead),
            Err(CommissionError::ShareOutOfRange(_))
        ));
        assert!(matches!(
            calc.split(d("10"), d("-5"), ProposalKind::Request),
            Err(CommissionError::ShareOutOfRange(_))
        ));
    }

    #[test]
    fn test_custom_rates_flow_through() {
        let rates = CommissionRates {
            lead_platform_pct: d("7.5"),
            request_platform_pct: d("12"),
            default_referrer_share_pct: 10,
        };
        let calc = CommissionCalculator::new(rates);
        let split = calc.split(d("200"), d("10"), ProposalKind::Lead).unwrap();
        assert_eq!(split.platform_commission, d("15"));
        assert_eq!(split.referrer_commission, d("20"));
        assert_eq!(split.professional_net, d("165"));
    }

    #[test]
    fn test_resolve_referrer_share_defaults_for_legacy_rows() {
        let rates = CommissionRates::default();
        assert_eq!(rates.resolve_referrer_share(None), d("5"));
        assert_eq!(rates.resolve_referrer_share(Some(20)), d("20"));
    }
}
