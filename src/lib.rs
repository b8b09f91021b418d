pub mod charge;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod processor;
pub mod schedule;
pub mod strategy;
pub mod transaction;
pub mod types;

// re-export key types
pub use charge::{Charge, ChargeDuePolicy, ChargeKind};
pub use decimal::{Currency, Money};
pub use errors::{AllocationError, Result};
pub use events::{AllocationEvent, EventStore};
pub use processor::{ChangedTransactionDetail, TransactionProcessor};
pub use schedule::{redistribute_charges, Installment};
pub use strategy::{
    AdvanceAllocation, AllocationStrategy, CreocoreStrategy, HeavensFamilyStrategy,
    InterestPrincipalPenaltyFeeStrategy, StrategyKind,
};
pub use transaction::{ChargePaidBy, Transaction, TransactionKind, TransactionRef};
pub use types::{ChargeId, Component, LoanId, PaymentAllocation, TransactionId};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
