use thiserror::Error;

use crate::decimal::Money;
use crate::types::ChargeId;

#[derive(Error, Debug)]
pub enum AllocationError {
    /// the walk consumed more than the transaction supplied, which can only
    /// happen through a programming error in a strategy
    #[error("remaining transaction amount went negative: {remaining}")]
    NegativeRemaining { remaining: Money },

    #[error("invalid transaction amount: {amount}")]
    InvalidTransactionAmount { amount: Money },

    /// caller-supplied schedule state breaks component accounting
    /// (paid + waived + written-off exceeding due, or a negative amount)
    #[error("invalid schedule state on installment {installment}: {message}")]
    InvalidScheduleState { installment: u32, message: String },

    #[error("invalid charge state: {message}")]
    InvalidChargeState { message: String },

    /// a charge-payment transaction references a charge the loan does not carry
    #[error("unknown charge: {charge_id}")]
    UnknownCharge { charge_id: ChargeId },

    #[error("charge-payment transaction carries no charge linkage")]
    MissingChargeLinkage,
}

pub type Result<T> = std::result::Result<T, AllocationError>;
