use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a recorded (persisted) transaction
pub type TransactionId = Uuid;

/// unique identifier for a charge
pub type ChargeId = Uuid;

/// per-component breakdown of an allocated amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaymentAllocation {
    pub principal: Money,
    pub interest: Money,
    pub fee: Money,
    pub penalty: Money,
}

impl PaymentAllocation {
    pub fn total(&self) -> Money {
        self.principal + self.interest + self.fee + self.penalty
    }

    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }
}

/// the four schedule components a transaction amount can be consumed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Principal,
    Interest,
    Fee,
    Penalty,
}
