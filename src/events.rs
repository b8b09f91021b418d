use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ChargeId, LoanId, PaymentAllocation, TransactionId};

/// events emitted while allocating transactions against a loan schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AllocationEvent {
    PaymentAllocated {
        loan_id: LoanId,
        transaction_date: NaiveDate,
        amount: Money,
        allocation: PaymentAllocation,
        overpayment: Money,
    },
    InterestWaived {
        loan_id: LoanId,
        transaction_date: NaiveDate,
        waived: Money,
    },
    ChargePaid {
        loan_id: LoanId,
        charge_id: ChargeId,
        amount: Money,
    },
    WriteOffRecorded {
        loan_id: LoanId,
        transaction_date: NaiveDate,
        allocation: PaymentAllocation,
    },
    LoanOverpaid {
        loan_id: LoanId,
        transaction_date: NaiveDate,
        amount: Money,
    },
    TransactionReversed {
        loan_id: LoanId,
        transaction_id: TransactionId,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<AllocationEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: AllocationEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<AllocationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[AllocationEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
