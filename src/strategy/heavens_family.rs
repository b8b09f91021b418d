use chrono::NaiveDate;

use crate::decimal::Money;
use crate::schedule::Installment;
use crate::transaction::Transaction;
use crate::types::Component;

use super::{pay_in_order, AdvanceAllocation, AllocationStrategy, DUE_ORDER, PRINCIPAL_FIRST_ORDER};

/// Heavens-Family allocation order: due and overdue payments consume
/// interest first; early payments favor principal. When several future
/// installments are unpaid at once, the spread of an advance payment is a
/// product decision carried by [`AdvanceAllocation`] rather than inferred:
/// either the earliest unpaid installment is settled in full, or only its
/// principal is consumed and the remainder carries to the next installment
/// in the walk.
pub struct HeavensFamilyStrategy {
    advance_allocation: AdvanceAllocation,
}

impl HeavensFamilyStrategy {
    pub fn new(advance_allocation: AdvanceAllocation) -> Self {
        Self { advance_allocation }
    }
}

impl AllocationStrategy for HeavensFamilyStrategy {
    fn name(&self) -> &'static str {
        "heavens-family"
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
        let order: &[Component] = match self.advance_allocation {
            AdvanceAllocation::SettleCurrentInstallment => &PRINCIPAL_FIRST_ORDER,
            AdvanceAllocation::PrincipalOnly => &PRINCIPAL_FIRST_ORDER[..1],
        };
        pay_in_order(&mut installments[target], transaction, remaining, order)
    }
}
