use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ChargeId, LoanId, PaymentAllocation, TransactionId};

/// whether a transaction has a persisted identity yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionRef {
    /// not recorded anywhere; allocation mutates it directly
    New,
    /// already recorded; reprocessing may reverse and replace it
    Existing(TransactionId),
}

impl TransactionRef {
    pub fn is_new(&self) -> bool {
        matches!(self, TransactionRef::New)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Repayment,
    InterestWaiver,
    WriteOff,
    ChargePayment,
}

/// how much of a transaction a single charge absorbed, recorded by the
/// engine for downstream reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargePaidBy {
    pub charge_id: ChargeId,
    pub amount: Money,
}

/// A financial event against a loan. The caller supplies kind, date and
/// total amount; the per-component breakdown, overpayment portion and
/// charge linkage amounts are populated by the allocation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub reference: TransactionRef,
    pub loan_id: LoanId,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub amount: Money,

    pub principal_portion: Money,
    pub interest_portion: Money,
    pub fee_portion: Money,
    pub penalty_portion: Money,
    pub overpayment_portion: Money,

    /// one-way flag set when reprocessing supersedes this transaction
    pub reversed: bool,

    /// charges a charge-payment transaction is intended to settle
    pub paying_charges: Vec<ChargeId>,
    /// per-charge amounts actually absorbed, filled in by the engine
    pub charges_paid: Vec<ChargePaidBy>,
}

impl Transaction {
    fn new(loan_id: LoanId, kind: TransactionKind, date: NaiveDate, amount: Money) -> Self {
        Self {
            reference: TransactionRef::New,
            loan_id,
            kind,
            date,
            amount,
            principal_portion: Money::ZERO,
            interest_portion: Money::ZERO,
            fee_portion: Money::ZERO,
            penalty_portion: Money::ZERO,
            overpayment_portion: Money::ZERO,
            reversed: false,
            paying_charges: Vec::new(),
            charges_paid: Vec::new(),
        }
    }

    pub fn repayment(loan_id: LoanId, date: NaiveDate, amount: Money) -> Self {
        Self::new(loan_id, TransactionKind::Repayment, date, amount)
    }

    pub fn interest_waiver(loan_id: LoanId, date: NaiveDate, amount: Money) -> Self {
        Self::new(loan_id, TransactionKind::InterestWaiver, date, amount)
    }

    pub fn write_off(loan_id: LoanId, date: NaiveDate) -> Self {
        Self::new(loan_id, TransactionKind::WriteOff, date, Money::ZERO)
    }

    pub fn charge_payment(
        loan_id: LoanId,
        date: NaiveDate,
        amount: Money,
        paying_charges: Vec<ChargeId>,
    ) -> Self {
        let mut transaction = Self::new(loan_id, TransactionKind::ChargePayment, date, amount);
        transaction.paying_charges = paying_charges;
        transaction
    }

    /// mark as already recorded under the given identity
    pub fn recorded(mut self, id: TransactionId) -> Self {
        self.reference = TransactionRef::Existing(id);
        self
    }

    pub fn is_repayment(&self) -> bool {
        self.kind == TransactionKind::Repayment
    }

    pub fn is_interest_waiver(&self) -> bool {
        self.kind == TransactionKind::InterestWaiver
    }

    pub fn is_write_off(&self) -> bool {
        self.kind == TransactionKind::WriteOff
    }

    pub fn is_charge_payment(&self) -> bool {
        self.kind == TransactionKind::ChargePayment
    }

    /// zero all engine-derived fields ahead of (re)allocation
    pub fn reset_derived_components(&mut self) {
        self.principal_portion = Money::ZERO;
        self.interest_portion = Money::ZERO;
        self.fee_portion = Money::ZERO;
        self.penalty_portion = Money::ZERO;
        self.overpayment_portion = Money::ZERO;
        self.charges_paid.clear();
    }

    /// accumulate component portions consumed from this transaction
    pub fn update_components(
        &mut self,
        principal: Money,
        interest: Money,
        fee: Money,
        penalty: Money,
    ) {
        self.principal_portion += principal;
        self.interest_portion += interest;
        self.fee_portion += fee;
        self.penalty_portion += penalty;
    }

    pub fn record_charge_paid(&mut self, charge_id: ChargeId, amount: Money) {
        if let Some(existing) = self
            .charges_paid
            .iter_mut()
            .find(|paid| paid.charge_id == charge_id)
        {
            existing.amount += amount;
        } else {
            self.charges_paid.push(ChargePaidBy { charge_id, amount });
        }
    }

    pub fn record_overpayment(&mut self, leftover: Money) {
        self.overpayment_portion = leftover;
    }

    /// a waiver larger than the waivable interest shrinks to what was
    /// actually consumed instead of becoming an overpayment
    pub fn shrink_to_allocated(&mut self) {
        self.amount = self.allocated();
    }

    pub fn reverse(&mut self) {
        self.reversed = true;
    }

    /// amount actually consumed from this transaction
    pub fn allocated(&self) -> Money {
        self.breakdown().total()
    }

    pub fn breakdown(&self) -> PaymentAllocation {
        PaymentAllocation {
            principal: self.principal_portion,
            interest: self.interest_portion,
            fee: self.fee_portion,
            penalty: self.penalty_portion,
        }
    }

    /// value comparison of component breakdowns, the test the diffing
    /// protocol uses to decide whether a recorded transaction still stands
    pub fn breakdown_matches(&self, other: &Transaction) -> bool {
        self.amount == other.amount
            && self.breakdown() == other.breakdown()
            && self.overpayment_portion == other.overpayment_portion
    }

    /// transient candidate for the clone-compare-replace protocol; carries
    /// no identity so a committed replacement is persisted as a new record
    pub fn clone_for_reprocessing(&self) -> Transaction {
        let mut candidate = self.clone();
        candidate.reference = TransactionRef::New;
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_components_accumulate_and_reset() {
        let mut tx = Transaction::repayment(Uuid::new_v4(), date(2024, 2, 1), Money::from_major(500));
        tx.update_components(
            Money::from_major(300),
            Money::from_major(100),
            Money::from_major(50),
            Money::ZERO,
        );
        tx.update_components(Money::from_major(50), Money::ZERO, Money::ZERO, Money::ZERO);

        assert_eq!(tx.allocated(), Money::from_major(500));
        assert_eq!(tx.breakdown().principal, Money::from_major(350));

        tx.reset_derived_components();
        assert_eq!(tx.allocated(), Money::ZERO);
        assert_eq!(tx.amount, Money::from_major(500));
    }

    #[test]
    fn test_breakdown_match_includes_overpayment() {
        let loan_id = Uuid::new_v4();
        let mut a = Transaction::repayment(loan_id, date(2024, 2, 1), Money::from_major(500));
        a.update_components(Money::from_major(500), Money::ZERO, Money::ZERO, Money::ZERO);

        let mut b = Transaction::repayment(loan_id, date(2024, 2, 1), Money::from_major(500));
        b.update_components(Money::from_major(300), Money::ZERO, Money::ZERO, Money::ZERO);
        b.record_overpayment(Money::from_major(200));

        assert!(!a.breakdown_matches(&b));

        let c = a.clone();
        assert!(a.breakdown_matches(&c));
    }

    #[test]
    fn test_clone_for_reprocessing_drops_identity() {
        let recorded = Transaction::repayment(
            Uuid::new_v4(),
            date(2024, 2, 1),
            Money::from_decimal(dec!(250.75)),
        )
        .recorded(Uuid::new_v4());

        let candidate = recorded.clone_for_reprocessing();
        assert!(candidate.reference.is_new());
        assert_eq!(candidate.amount, recorded.amount);
        assert!(!candidate.reversed);
    }

    #[test]
    fn test_charge_paid_linkage_merges_per_charge() {
        let mut tx = Transaction::repayment(Uuid::new_v4(), date(2024, 2, 1), Money::from_major(60));
        let charge_id = Uuid::new_v4();
        tx.record_charge_paid(charge_id, Money::from_major(40));
        tx.record_charge_paid(charge_id, Money::from_major(20));

        assert_eq!(tx.charges_paid.len(), 1);
        assert_eq!(tx.charges_paid[0].amount, Money::from_major(60));
    }
}
