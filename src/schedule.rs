use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::charge::Charge;
use crate::decimal::{Currency, Money};
use crate::types::LoanId;

/// One scheduled due-period of a loan's amortization schedule.
///
/// Principal and interest due amounts are fixed by schedule generation;
/// fee and penalty dues are re-derived from the loan's charges by
/// [`redistribute_charges`]. The paid/waived/written-off components are
/// owned by the allocation engine and reset on every full reprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub loan_id: LoanId,
    pub number: u32,
    pub due_date: NaiveDate,

    pub principal_due: Money,
    pub interest_due: Money,
    pub fee_due: Money,
    pub penalty_due: Money,

    pub principal_paid: Money,
    pub principal_written_off: Money,
    pub interest_paid: Money,
    pub interest_waived: Money,
    pub interest_written_off: Money,
    pub fee_paid: Money,
    pub fee_waived: Money,
    pub fee_written_off: Money,
    pub penalty_paid: Money,
    pub penalty_waived: Money,
    pub penalty_written_off: Money,

    obligations_met: bool,
    obligations_met_on: Option<NaiveDate>,
}

impl Installment {
    pub fn new(
        loan_id: LoanId,
        number: u32,
        due_date: NaiveDate,
        principal_due: Money,
        interest_due: Money,
    ) -> Self {
        Self {
            loan_id,
            number,
            due_date,
            principal_due,
            interest_due,
            fee_due: Money::ZERO,
            penalty_due: Money::ZERO,
            principal_paid: Money::ZERO,
            principal_written_off: Money::ZERO,
            interest_paid: Money::ZERO,
            interest_waived: Money::ZERO,
            interest_written_off: Money::ZERO,
            fee_paid: Money::ZERO,
            fee_waived: Money::ZERO,
            fee_written_off: Money::ZERO,
            penalty_paid: Money::ZERO,
            penalty_waived: Money::ZERO,
            penalty_written_off: Money::ZERO,
            obligations_met: false,
            obligations_met_on: None,
        }
    }

    pub fn principal_outstanding(&self) -> Money {
        self.principal_due - self.principal_paid - self.principal_written_off
    }

    pub fn interest_outstanding(&self) -> Money {
        self.interest_due - self.interest_paid - self.interest_waived - self.interest_written_off
    }

    pub fn fee_outstanding(&self) -> Money {
        self.fee_due - self.fee_paid - self.fee_waived - self.fee_written_off
    }

    pub fn penalty_outstanding(&self) -> Money {
        self.penalty_due - self.penalty_paid - self.penalty_waived - self.penalty_written_off
    }

    pub fn total_outstanding(&self) -> Money {
        self.principal_outstanding()
            + self.interest_outstanding()
            + self.fee_outstanding()
            + self.penalty_outstanding()
    }

    pub fn is_not_fully_paid_off(&self) -> bool {
        !self.obligations_met
    }

    pub fn obligations_met_on(&self) -> Option<NaiveDate> {
        self.obligations_met_on
    }

    /// zero out all engine-derived components ahead of a replay
    pub fn reset_derived_components(&mut self) {
        self.principal_paid = Money::ZERO;
        self.principal_written_off = Money::ZERO;
        self.interest_paid = Money::ZERO;
        self.interest_waived = Money::ZERO;
        self.interest_written_off = Money::ZERO;
        self.fee_paid = Money::ZERO;
        self.fee_waived = Money::ZERO;
        self.fee_written_off = Money::ZERO;
        self.penalty_paid = Money::ZERO;
        self.penalty_waived = Money::ZERO;
        self.penalty_written_off = Money::ZERO;
        self.obligations_met = false;
        self.obligations_met_on = None;
    }

    /// recompute date-dependent view state without touching due amounts;
    /// an installment with nothing due is met as of the disbursement date
    pub fn update_derived_fields(&mut self, _currency: &Currency, disbursement_date: NaiveDate) {
        if !self.obligations_met && self.total_outstanding().is_zero() {
            self.obligations_met = true;
            self.obligations_met_on = Some(disbursement_date);
        }
    }

    pub fn pay_principal_component(
        &mut self,
        transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money {
        let portion = remaining.min(self.principal_outstanding()).max(Money::ZERO);
        self.principal_paid += portion;
        self.check_obligations_met(transaction_date);
        portion
    }

    pub fn pay_interest_component(
        &mut self,
        transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money {
        let portion = remaining.min(self.interest_outstanding()).max(Money::ZERO);
        self.interest_paid += portion;
        self.check_obligations_met(transaction_date);
        portion
    }

    pub fn pay_fee_component(&mut self, transaction_date: NaiveDate, remaining: Money) -> Money {
        let portion = remaining.min(self.fee_outstanding()).max(Money::ZERO);
        self.fee_paid += portion;
        self.check_obligations_met(transaction_date);
        portion
    }

    pub fn pay_penalty_component(
        &mut self,
        transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money {
        let portion = remaining.min(self.penalty_outstanding()).max(Money::ZERO);
        self.penalty_paid += portion;
        self.check_obligations_met(transaction_date);
        portion
    }

    /// forgive outstanding interest without a cash payment
    pub fn waive_interest_component(
        &mut self,
        transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money {
        let portion = remaining.min(self.interest_outstanding()).max(Money::ZERO);
        self.interest_waived += portion;
        self.check_obligations_met(transaction_date);
        portion
    }

    pub fn write_off_outstanding_principal(
        &mut self,
        transaction_date: NaiveDate,
        _currency: &Currency,
    ) -> Money {
        let outstanding = self.principal_outstanding();
        self.principal_written_off += outstanding;
        self.check_obligations_met(transaction_date);
        outstanding
    }

    pub fn write_off_outstanding_interest(
        &mut self,
        transaction_date: NaiveDate,
        _currency: &Currency,
    ) -> Money {
        let outstanding = self.interest_outstanding();
        self.interest_written_off += outstanding;
        self.check_obligations_met(transaction_date);
        outstanding
    }

    pub fn write_off_outstanding_fee(
        &mut self,
        transaction_date: NaiveDate,
        _currency: &Currency,
    ) -> Money {
        let outstanding = self.fee_outstanding();
        self.fee_written_off += outstanding;
        self.check_obligations_met(transaction_date);
        outstanding
    }

    pub fn write_off_outstanding_penalty(
        &mut self,
        transaction_date: NaiveDate,
        _currency: &Currency,
    ) -> Money {
        let outstanding = self.penalty_outstanding();
        self.penalty_written_off += outstanding;
        self.check_obligations_met(transaction_date);
        outstanding
    }

    fn check_obligations_met(&mut self, transaction_date: NaiveDate) {
        self.obligations_met = self.total_outstanding().is_zero();
        self.obligations_met_on = if self.obligations_met {
            Some(transaction_date)
        } else {
            None
        };
    }
}

/// Re-derive each installment's fee and penalty portions from the loan's
/// charges: a charge contributes to the installment whose period window
/// (previous due date exclusive, due date inclusive; the first window opens
/// at disbursement) contains its due date. Waived charge amounts are
/// redistributed the same way. At-disbursement charges never enter the
/// schedule.
pub fn redistribute_charges(
    currency: &Currency,
    disbursement_date: NaiveDate,
    installments: &mut [Installment],
    charges: &[Charge],
) {
    let mut period_start = disbursement_date;
    for installment in installments.iter_mut() {
        let mut fee_due = Money::ZERO;
        let mut fee_waived = Money::ZERO;
        let mut penalty_due = Money::ZERO;
        let mut penalty_waived = Money::ZERO;

        for charge in charges {
            if !charge.is_due_for_collection_between(period_start, installment.due_date) {
                continue;
            }
            if charge.is_fee_charge() {
                fee_due += charge.amount;
                fee_waived += charge.amount_waived;
            } else {
                penalty_due += charge.amount;
                penalty_waived += charge.amount_waived;
            }
        }

        installment.fee_due = currency.round(fee_due);
        installment.fee_waived = currency.round(fee_waived);
        installment.penalty_due = currency.round(penalty_due);
        installment.penalty_waived = currency.round(penalty_waived);

        period_start = installment.due_date;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::{ChargeDuePolicy, ChargeKind};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn installment(number: u32, due: NaiveDate) -> Installment {
        Installment::new(
            Uuid::new_v4(),
            number,
            due,
            Money::from_major(1000),
            Money::from_major(100),
        )
    }

    #[test]
    fn test_component_payment_clamps_and_tracks_settlement() {
        let mut inst = installment(1, date(2024, 2, 1));

        let interest = inst.pay_interest_component(date(2024, 2, 1), Money::from_major(150));
        assert_eq!(interest, Money::from_major(100));
        assert!(inst.is_not_fully_paid_off());

        let principal = inst.pay_principal_component(date(2024, 2, 1), Money::from_major(1000));
        assert_eq!(principal, Money::from_major(1000));
        assert!(!inst.is_not_fully_paid_off());
        assert_eq!(inst.obligations_met_on(), Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_reset_reopens_obligations() {
        let mut inst = installment(1, date(2024, 2, 1));
        inst.pay_interest_component(date(2024, 2, 1), Money::from_major(100));
        inst.pay_principal_component(date(2024, 2, 1), Money::from_major(1000));
        assert!(!inst.is_not_fully_paid_off());

        inst.reset_derived_components();
        assert!(inst.is_not_fully_paid_off());
        assert_eq!(inst.total_outstanding(), Money::from_major(1100));
        assert_eq!(inst.obligations_met_on(), None);
    }

    #[test]
    fn test_waived_interest_counts_toward_settlement() {
        let mut inst = installment(1, date(2024, 2, 1));
        inst.waive_interest_component(date(2024, 1, 15), Money::from_major(100));
        assert_eq!(inst.interest_outstanding(), Money::ZERO);
        assert_eq!(inst.interest_paid, Money::ZERO);

        inst.pay_principal_component(date(2024, 2, 1), Money::from_major(1000));
        assert!(!inst.is_not_fully_paid_off());
    }

    #[test]
    fn test_write_off_zeroes_every_component() {
        let currency = Currency::new("USD", 2);
        let mut inst = installment(1, date(2024, 2, 1));
        inst.fee_due = Money::from_major(20);
        inst.pay_interest_component(date(2024, 2, 1), Money::from_major(40));

        let written_off_date = date(2024, 6, 1);
        let principal = inst.write_off_outstanding_principal(written_off_date, &currency);
        let interest = inst.write_off_outstanding_interest(written_off_date, &currency);
        let fee = inst.write_off_outstanding_fee(written_off_date, &currency);
        let penalty = inst.write_off_outstanding_penalty(written_off_date, &currency);

        assert_eq!(principal, Money::from_major(1000));
        assert_eq!(interest, Money::from_major(60));
        assert_eq!(fee, Money::from_major(20));
        assert_eq!(penalty, Money::ZERO);
        assert_eq!(inst.total_outstanding(), Money::ZERO);
        assert!(!inst.is_not_fully_paid_off());
        assert_eq!(inst.obligations_met_on(), Some(written_off_date));
    }

    #[test]
    fn test_charge_redistribution_uses_period_windows() {
        let currency = Currency::new("USD", 2);
        let loan_id = Uuid::new_v4();
        let disbursement = date(2024, 1, 1);
        let mut installments = vec![installment(1, date(2024, 2, 1)), installment(2, date(2024, 3, 1))];

        let charges = vec![
            Charge::new(
                loan_id,
                "first period fee",
                ChargeKind::Fee,
                ChargeDuePolicy::OnDate { due_date: date(2024, 1, 15) },
                Money::from_major(30),
                0,
            ),
            // due exactly on installment 1's due date: inclusive end, period 1
            Charge::new(
                loan_id,
                "boundary fee",
                ChargeKind::Fee,
                ChargeDuePolicy::OnDate { due_date: date(2024, 2, 1) },
                Money::from_major(5),
                1,
            ),
            Charge::new(
                loan_id,
                "late penalty",
                ChargeKind::Penalty,
                ChargeDuePolicy::OnDate { due_date: date(2024, 2, 15) },
                Money::from_major(12),
                2,
            ),
            Charge::new(
                loan_id,
                "origination",
                ChargeKind::Fee,
                ChargeDuePolicy::AtDisbursement,
                Money::from_major(100),
                3,
            ),
        ];

        redistribute_charges(&currency, disbursement, &mut installments, &charges);

        assert_eq!(installments[0].fee_due, Money::from_major(35));
        assert_eq!(installments[0].penalty_due, Money::ZERO);
        assert_eq!(installments[1].fee_due, Money::ZERO);
        assert_eq!(installments[1].penalty_due, Money::from_major(12));
    }

    #[test]
    fn test_charge_redistribution_carries_waived_amounts() {
        let currency = Currency::new("USD", 2);
        let loan_id = Uuid::new_v4();
        let mut installments = vec![installment(1, date(2024, 2, 1))];

        let mut charge = Charge::new(
            loan_id,
            "waived fee",
            ChargeKind::Fee,
            ChargeDuePolicy::OnDate { due_date: date(2024, 1, 20) },
            Money::from_major(40),
            0,
        );
        charge.amount_waived = Money::from_major(40);

        redistribute_charges(&currency, date(2024, 1, 1), &mut installments, &[charge]);

        assert_eq!(installments[0].fee_due, Money::from_major(40));
        assert_eq!(installments[0].fee_waived, Money::from_major(40));
        assert_eq!(installments[0].fee_outstanding(), Money::ZERO);
    }
}
