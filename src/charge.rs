use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Currency, Money};
use crate::types::{ChargeId, LoanId};

/// fee and penalty charges are mutually exclusive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeKind {
    Fee,
    Penalty,
}

/// when a charge falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeDuePolicy {
    /// due when the loan is disbursed; excluded from repayment-schedule
    /// allocation entirely
    AtDisbursement,
    /// due on an explicit calendar date
    OnDate { due_date: NaiveDate },
    /// due with a specific installment (carries that installment's due date)
    WithInstallment { due_date: NaiveDate },
}

/// A fee or penalty attached to a loan. Paid amounts are re-earned through
/// replay on every full reprocess; only at-disbursement charges keep their
/// paid state across reprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub loan_id: LoanId,
    pub name: String,
    pub kind: ChargeKind,
    pub due: ChargeDuePolicy,
    pub amount: Money,
    pub amount_paid: Money,
    pub amount_waived: Money,
    /// creation order, the stable secondary key for earliest-due tie-breaks
    pub sequence: u32,
}

impl Charge {
    pub fn new(
        loan_id: LoanId,
        name: impl Into<String>,
        kind: ChargeKind,
        due: ChargeDuePolicy,
        amount: Money,
        sequence: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            name: name.into(),
            kind,
            due,
            amount,
            amount_paid: Money::ZERO,
            amount_waived: Money::ZERO,
            sequence,
        }
    }

    pub fn is_due_at_disbursement(&self) -> bool {
        matches!(self.due, ChargeDuePolicy::AtDisbursement)
    }

    pub fn is_fee_charge(&self) -> bool {
        self.kind == ChargeKind::Fee
    }

    pub fn is_penalty_charge(&self) -> bool {
        self.kind == ChargeKind::Penalty
    }

    /// the calendar date this charge falls due; None for at-disbursement
    pub fn due_date(&self) -> Option<NaiveDate> {
        match self.due {
            ChargeDuePolicy::AtDisbursement => None,
            ChargeDuePolicy::OnDate { due_date } | ChargeDuePolicy::WithInstallment { due_date } => {
                Some(due_date)
            }
        }
    }

    pub fn outstanding(&self) -> Money {
        self.amount - self.amount_paid - self.amount_waived
    }

    pub fn is_fully_paid(&self) -> bool {
        self.outstanding().is_zero()
    }

    pub fn is_not_fully_paid(&self) -> bool {
        !self.is_fully_paid()
    }

    /// whether this charge's due date falls within a repayment period window
    /// (start exclusive, end inclusive)
    pub fn is_due_for_collection_between(
        &self,
        period_start_exclusive: NaiveDate,
        period_end_inclusive: NaiveDate,
    ) -> bool {
        match self.due_date() {
            Some(due) => due > period_start_exclusive && due <= period_end_inclusive,
            None => false,
        }
    }

    /// Apply up to `amount` toward this charge's outstanding balance and
    /// return the portion actually consumed. This is the one place in the
    /// engine that clamps instead of failing: you cannot pay more toward a
    /// charge than is outstanding, and the excess stays with the caller.
    /// A negative amount is a contract violation, not a clamp case.
    pub fn update_paid_amount_by(&mut self, amount: Money) -> Money {
        debug_assert!(
            !amount.is_negative(),
            "charge payment amount must not be negative, got {amount}"
        );
        let consumed = amount.max(Money::ZERO).min(self.outstanding());
        self.amount_paid += consumed;
        consumed
    }

    /// zero the paid amount ahead of a full reprocess; at-disbursement
    /// charges are settled outside the schedule and keep their state
    pub fn reset_paid_amount(&mut self, currency: &Currency) {
        if self.is_due_at_disbursement() {
            return;
        }
        self.amount_paid = currency.zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fee_charge(due_date: NaiveDate, amount: Money) -> Charge {
        Charge::new(
            Uuid::new_v4(),
            "service fee",
            ChargeKind::Fee,
            ChargeDuePolicy::OnDate { due_date },
            amount,
            0,
        )
    }

    #[test]
    fn test_payment_clamps_to_outstanding() {
        let mut charge = fee_charge(date(2024, 2, 1), Money::from_major(100));

        let consumed = charge.update_paid_amount_by(Money::from_major(150));
        assert_eq!(consumed, Money::from_major(100));
        assert!(charge.is_fully_paid());

        // nothing left to consume
        assert_eq!(charge.update_paid_amount_by(Money::from_major(10)), Money::ZERO);
    }

    #[test]
    #[should_panic(expected = "must not be negative")]
    fn test_negative_payment_amount_is_rejected() {
        let mut charge = fee_charge(date(2024, 2, 1), Money::from_major(100));
        charge.update_paid_amount_by(Money::ZERO - Money::from_major(10));
    }

    #[test]
    fn test_partial_payment_leaves_outstanding() {
        let mut charge = fee_charge(date(2024, 2, 1), Money::from_major(100));

        let consumed = charge.update_paid_amount_by(Money::from_decimal(dec!(40.50)));
        assert_eq!(consumed, Money::from_decimal(dec!(40.50)));
        assert_eq!(charge.outstanding(), Money::from_decimal(dec!(59.50)));
        assert!(charge.is_not_fully_paid());
    }

    #[test]
    fn test_waived_amount_reduces_outstanding() {
        let mut charge = fee_charge(date(2024, 2, 1), Money::from_major(100));
        charge.amount_waived = Money::from_major(30);

        assert_eq!(charge.outstanding(), Money::from_major(70));
        let consumed = charge.update_paid_amount_by(Money::from_major(100));
        assert_eq!(consumed, Money::from_major(70));
        assert!(charge.is_fully_paid());
    }

    #[test]
    fn test_collection_window_is_start_exclusive_end_inclusive() {
        let charge = fee_charge(date(2024, 2, 1), Money::from_major(10));

        assert!(charge.is_due_for_collection_between(date(2024, 1, 1), date(2024, 2, 1)));
        assert!(!charge.is_due_for_collection_between(date(2024, 2, 1), date(2024, 3, 1)));
        assert!(!charge.is_due_for_collection_between(date(2023, 12, 1), date(2024, 1, 31)));
    }

    #[test]
    fn test_disbursement_charge_keeps_paid_state_on_reset() {
        let currency = Currency::new("USD", 2);
        let loan_id = Uuid::new_v4();
        let mut disbursement = Charge::new(
            loan_id,
            "origination",
            ChargeKind::Fee,
            ChargeDuePolicy::AtDisbursement,
            Money::from_major(25),
            0,
        );
        disbursement.update_paid_amount_by(Money::from_major(25));

        let mut scheduled = fee_charge(date(2024, 2, 1), Money::from_major(10));
        scheduled.update_paid_amount_by(Money::from_major(10));

        disbursement.reset_paid_amount(&currency);
        scheduled.reset_paid_amount(&currency);

        assert_eq!(disbursement.amount_paid, Money::from_major(25));
        assert_eq!(scheduled.amount_paid, Money::ZERO);
        assert!(!disbursement.is_due_for_collection_between(date(2024, 1, 1), date(2024, 12, 31)));
    }
}
