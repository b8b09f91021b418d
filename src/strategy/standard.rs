use chrono::NaiveDate;

use crate::decimal::Money;
use crate::schedule::Installment;
use crate::transaction::Transaction;

use super::{pay_in_order, AllocationStrategy, DUE_ORDER};

/// The default allocation order: interest, then principal, then penalties,
/// then fees, regardless of whether the payment is early, on time or late.
/// Advance payments simply pre-pay the earliest unpaid installment.
pub struct InterestPrincipalPenaltyFeeStrategy;

impl AllocationStrategy for InterestPrincipalPenaltyFeeStrategy {
    fn name(&self) -> &'static str {
        "interest-principal-penalty-fee"
    }

    fn on_time_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        remaining: Money,
    ) -> Money {
        pay_in_order(&mut installments[target], transaction, remaining, &DUE_ORDER)
    }

    fn late_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        remaining: Money,
    ) -> Money {
        pay_in_order(&mut installments[target], transaction, remaining, &DUE_ORDER)
    }

    fn advance_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        _transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money {
        pay_in_order(&mut installments[target], transaction, remaining, &DUE_ORDER)
    }
}
