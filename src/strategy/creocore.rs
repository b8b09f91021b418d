use chrono::NaiveDate;

use crate::decimal::Money;
use crate::schedule::Installment;
use crate::transaction::Transaction;

use super::{pay_in_order, AllocationStrategy, DUE_ORDER, PRINCIPAL_FIRST_ORDER};

/// Creocore allocation order: due and overdue payments consume interest
/// first, but a payment in advance of the due date is treated as a
/// principal pre-payment and settles the earliest unpaid installment in
/// principal-first order.
pub struct CreocoreStrategy;

impl AllocationStrategy for CreocoreStrategy {
    fn name(&self) -> &'static str {
        "creocore"
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
        pay_in_order(
            &mut installments[target],
            transaction,
            remaining,
            &PRINCIPAL_FIRST_ORDER,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn single_installment() -> Vec<Installment> {
        vec![Installment::new(
            Uuid::new_v4(),
            1,
            date(2024, 2, 1),
            Money::from_major(1000),
            Money::from_major(100),
        )]
    }

    #[test]
    fn test_advance_payment_goes_to_principal_first() {
        let strategy = CreocoreStrategy;
        let mut installments = single_installment();
        let mut tx = Transaction::repayment(
            installments[0].loan_id,
            date(2024, 1, 15),
            Money::from_major(150),
        );

        let remaining = strategy.advance_payment(
            &mut installments,
            0,
            &mut tx,
            date(2024, 1, 15),
            Money::from_major(150),
        );

        assert_eq!(remaining, Money::ZERO);
        assert_eq!(tx.principal_portion, Money::from_major(150));
        assert_eq!(tx.interest_portion, Money::ZERO);
    }

    #[test]
    fn test_on_time_payment_goes_to_interest_first() {
        let strategy = CreocoreStrategy;
        let mut installments = single_installment();
        let mut tx = Transaction::repayment(
            installments[0].loan_id,
            date(2024, 2, 1),
            Money::from_major(150),
        );

        let remaining = strategy.on_time_payment(
            &mut installments,
            0,
            &mut tx,
            Money::from_major(150),
        );

        assert_eq!(remaining, Money::ZERO);
        assert_eq!(tx.interest_portion, Money::from_major(100));
        assert_eq!(tx.principal_portion, Money::from_major(50));
    }
}
