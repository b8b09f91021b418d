pub mod creocore;
pub mod heavens_family;
pub mod standard;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::schedule::Installment;
use crate::transaction::Transaction;
use crate::types::Component;

pub use creocore::CreocoreStrategy;
pub use heavens_family::HeavensFamilyStrategy;
pub use standard::InterestPrincipalPenaltyFeeStrategy;

/// Order-of-consumption policy for repayment allocation. Variants differ
/// only in the precedence of installment components and in how payments in
/// advance of a due date are treated; the surrounding walk, charge handling
/// and diffing live in the processor.
pub trait AllocationStrategy {
    fn name(&self) -> &'static str;

    /// transaction dated exactly on the installment's due date
    fn on_time_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        remaining: Money,
    ) -> Money;

    /// transaction dated strictly after the installment's due date
    fn late_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        remaining: Money,
    ) -> Money;

    /// transaction dated strictly before the installment's due date
    fn advance_payment(
        &self,
        installments: &mut [Installment],
        target: usize,
        transaction: &mut Transaction,
        transaction_date: NaiveDate,
        remaining: Money,
    ) -> Money;

    /// invoked once, after every installment is exhausted, if an amount is
    /// left over; the leftover is not attributed to any installment
    fn on_overpayment(&self, _transaction: &Transaction, _leftover: Money) {}
}

/// How an advance payment is spread when several future installments are
/// simultaneously unpaid. This precedence is a product-level decision, not
/// something the engine infers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdvanceAllocation {
    /// settle the earliest unpaid installment in full before moving on
    #[default]
    SettleCurrentInstallment,
    /// consume only the principal component of each unpaid installment,
    /// carrying the rest of the amount forward through the walk
    PrincipalOnly,
}

/// Closed set of allocation strategies, selected once per loan product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// interest -> principal -> penalty -> fee in every payment state
    InterestPrincipalPenaltyFee,
    /// standard due order; advance payments go to principal first
    Creocore,
    /// standard due order; advance payments are principal-first with
    /// configurable multi-installment precedence
    HeavensFamily { advance_allocation: AdvanceAllocation },
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn AllocationStrategy> {
        match self {
            StrategyKind::InterestPrincipalPenaltyFee => {
                Box::new(InterestPrincipalPenaltyFeeStrategy)
            }
            StrategyKind::Creocore => Box::new(CreocoreStrategy),
            StrategyKind::HeavensFamily { advance_allocation } => {
                Box::new(HeavensFamilyStrategy::new(*advance_allocation))
            }
        }
    }
}

/// due-payment precedence shared by every variant
pub(crate) const DUE_ORDER: [Component; 4] = [
    Component::Interest,
    Component::Principal,
    Component::Penalty,
    Component::Fee,
];

/// principal-first precedence used by variants that send early payments
/// toward principal
pub(crate) const PRINCIPAL_FIRST_ORDER: [Component; 4] = [
    Component::Principal,
    Component::Interest,
    Component::Penalty,
    Component::Fee,
];

/// Consume `remaining` against one installment's components in the given
/// order, recording each portion on the transaction, and return the
/// unconsumed remainder. Interest-waiver transactions route their amount to
/// the waived interest bucket and ignore every other component; a
/// charge-payment transaction only ever settles penalty and fee components.
pub(crate) fn pay_in_order(
    installment: &mut Installment,
    transaction: &mut Transaction,
    remaining: Money,
    order: &[Component],
) -> Money {
    let mut remaining = remaining;
    let value_date = transaction.date;

    if transaction.is_interest_waiver() {
        if order.contains(&Component::Interest) {
            let waived = installment.waive_interest_component(value_date, remaining);
            transaction.update_components(Money::ZERO, waived, Money::ZERO, Money::ZERO);
            remaining -= waived;
        }
        return remaining;
    }

    let charge_payment = transaction.is_charge_payment();
    for component in order {
        if remaining.is_zero() {
            break;
        }
        if charge_payment && !matches!(component, Component::Fee | Component::Penalty) {
            continue;
        }
        match component {
            Component::Principal => {
                let portion = installment.pay_principal_component(value_date, remaining);
                transaction.update_components(portion, Money::ZERO, Money::ZERO, Money::ZERO);
                remaining -= portion;
            }
            Component::Interest => {
                let portion = installment.pay_interest_component(value_date, remaining);
                transaction.update_components(Money::ZERO, portion, Money::ZERO, Money::ZERO);
                remaining -= portion;
            }
            Component::Fee => {
                let portion = installment.pay_fee_component(value_date, remaining);
                transaction.update_components(Money::ZERO, Money::ZERO, portion, Money::ZERO);
                remaining -= portion;
            }
            Component::Penalty => {
                let portion = installment.pay_penalty_component(value_date, remaining);
                transaction.update_components(Money::ZERO, Money::ZERO, Money::ZERO, portion);
                remaining -= portion;
            }
        }
    }

    remaining
}
