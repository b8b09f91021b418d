use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::charge::{Charge, ChargeKind};
use crate::decimal::{Currency, Money};
use crate::errors::{AllocationError, Result};
use crate::events::{AllocationEvent, EventStore};
use crate::schedule::{redistribute_charges, Installment};
use crate::strategy::{AllocationStrategy, StrategyKind};
use crate::transaction::{Transaction, TransactionKind, TransactionRef};
use crate::types::ChargeId;

/// Audit-safe output of a full reprocess: transactions whose recorded
/// component breakdown no longer stands, paired with their recomputed
/// replacements. `reversed[i]` is superseded by `new_transactions[i]`; the
/// caller persists the pair as an append-only correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangedTransactionDetail {
    pub reversed: Vec<Transaction>,
    pub new_transactions: Vec<Transaction>,
}

impl ChangedTransactionDetail {
    pub fn is_empty(&self) -> bool {
        self.reversed.is_empty() && self.new_transactions.is_empty()
    }
}

/// The allocation engine: walks a loan's installments in chronological
/// order, classifies each transaction per installment as advance, on-time
/// or late, and hands consumption to the configured strategy. Pure
/// computation over the state passed in; the caller owns persistence and
/// transaction boundaries.
pub struct TransactionProcessor {
    strategy: Box<dyn AllocationStrategy>,
}

impl TransactionProcessor {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            strategy: kind.build(),
        }
    }

    pub fn with_strategy(strategy: Box<dyn AllocationStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Allocate a single transaction against the schedule. Repayments,
    /// waivers and charge payments run the installment walk plus the charge
    /// pass; write-offs settle every open installment as of their date.
    pub fn process_transaction(
        &self,
        transaction: &mut Transaction,
        currency: &Currency,
        installments: &mut [Installment],
        charges: &mut [Charge],
        events: &mut EventStore,
    ) -> Result<()> {
        if transaction.amount.is_negative() {
            return Err(AllocationError::InvalidTransactionAmount {
                amount: transaction.amount,
            });
        }
        if transaction.is_write_off() {
            transaction.reset_derived_components();
            self.process_write_off(transaction, currency, installments, events);
            return Ok(());
        }
        let amount = transaction.amount;
        self.allocate_transaction(
            transaction,
            currency,
            installments,
            0..installments.len(),
            amount,
            charges,
            events,
        )
    }

    /// Terminal full-loan write-off: every open installment's outstanding
    /// components are recorded as written off as of the transaction date
    /// and accumulated into the transaction's breakdown. No remaining
    /// amount applies.
    pub fn process_write_off(
        &self,
        transaction: &mut Transaction,
        currency: &Currency,
        installments: &mut [Installment],
        events: &mut EventStore,
    ) {
        let value_date = transaction.date;
        let mut principal = Money::ZERO;
        let mut interest = Money::ZERO;
        let mut fee = Money::ZERO;
        let mut penalty = Money::ZERO;

        for installment in installments
            .iter_mut()
            .filter(|installment| installment.is_not_fully_paid_off())
        {
            principal += installment.write_off_outstanding_principal(value_date, currency);
            interest += installment.write_off_outstanding_interest(value_date, currency);
            fee += installment.write_off_outstanding_fee(value_date, currency);
            penalty += installment.write_off_outstanding_penalty(value_date, currency);
        }

        transaction.update_components(principal, interest, fee, penalty);
        transaction.amount = transaction.allocated();

        events.emit(AllocationEvent::WriteOffRecorded {
            loan_id: transaction.loan_id,
            transaction_date: value_date,
            allocation: transaction.breakdown(),
        });
    }

    /// Replay the loan's entire ordered transaction history against a reset
    /// schedule, producing the reversed/replacement diff for transactions
    /// whose recomputed breakdown differs from what was recorded. The
    /// computation is deterministic and idempotent: reprocessing an
    /// unchanged history yields identical end state and an empty diff.
    /// Events describe the replay and are drained by the caller.
    pub fn reprocess(
        &self,
        disbursement_date: NaiveDate,
        currency: &Currency,
        transactions: &mut [Transaction],
        installments: &mut [Installment],
        charges: &mut [Charge],
        events: &mut EventStore,
    ) -> Result<ChangedTransactionDetail> {
        validate_inputs(transactions, installments, charges)?;

        for charge in charges.iter_mut() {
            charge.reset_paid_amount(currency);
        }

        installments.sort_by(|a, b| (a.due_date, a.number).cmp(&(b.due_date, b.number)));
        for installment in installments.iter_mut() {
            installment.reset_derived_components();
        }

        // re-derive fee/penalty portions per period, picking up waived charges
        redistribute_charges(currency, disbursement_date, installments, charges);
        for installment in installments.iter_mut() {
            installment.update_derived_fields(currency, disbursement_date);
        }

        let mut detail = ChangedTransactionDetail::default();
        let mut deferred = Vec::new();
        for index in 0..transactions.len() {
            if transactions[index].is_charge_payment() {
                self.replay_charge_payment(
                    &mut transactions[index],
                    disbursement_date,
                    currency,
                    installments,
                    charges,
                    events,
                )?;
            } else {
                deferred.push(index);
            }
        }

        for index in deferred {
            let transaction = &mut transactions[index];
            match transaction.kind {
                TransactionKind::WriteOff => {
                    transaction.reset_derived_components();
                    self.process_write_off(transaction, currency, installments, events);
                }
                TransactionKind::Repayment | TransactionKind::InterestWaiver => {
                    match transaction.reference {
                        TransactionRef::New => {
                            let amount = transaction.amount;
                            self.allocate_transaction(
                                transaction,
                                currency,
                                installments,
                                0..installments.len(),
                                amount,
                                charges,
                                events,
                            )?;
                        }
                        TransactionRef::Existing(transaction_id) => {
                            // replay against a transient candidate and only
                            // commit a reversal if the breakdown moved
                            let mut candidate = transaction.clone_for_reprocessing();
                            let amount = candidate.amount;
                            self.allocate_transaction(
                                &mut candidate,
                                currency,
                                installments,
                                0..installments.len(),
                                amount,
                                charges,
                                events,
                            )?;
                            if !transaction.breakdown_matches(&candidate) {
                                transaction.reverse();
                                events.emit(AllocationEvent::TransactionReversed {
                                    loan_id: transaction.loan_id,
                                    transaction_id,
                                });
                                detail.reversed.push(transaction.clone());
                                detail.new_transactions.push(candidate);
                            }
                        }
                    }
                }
                TransactionKind::ChargePayment => unreachable!("partitioned above"),
            }
        }

        Ok(detail)
    }

    /// Map a charge-payment transaction to the installments whose periods
    /// contain its charges' due dates, then allocate against exactly those
    /// installments, one period at a time.
    fn replay_charge_payment(
        &self,
        transaction: &mut Transaction,
        disbursement_date: NaiveDate,
        currency: &Currency,
        installments: &mut [Installment],
        charges: &mut [Charge],
        events: &mut EventStore,
    ) -> Result<()> {
        if transaction.paying_charges.is_empty() {
            return Err(AllocationError::MissingChargeLinkage);
        }
        for charge_id in &transaction.paying_charges {
            if !charges.iter().any(|charge| charge.id == *charge_id) {
                return Err(AllocationError::UnknownCharge {
                    charge_id: *charge_id,
                });
            }
        }

        struct PaidDetail {
            installment_index: usize,
            amount: Money,
        }

        let mut details = Vec::new();
        let mut period_start = disbursement_date;
        for (installment_index, installment) in installments.iter().enumerate() {
            for charge_id in &transaction.paying_charges {
                let charge = charges
                    .iter()
                    .find(|charge| charge.id == *charge_id)
                    .expect("linkage checked above");
                if charge.is_due_for_collection_between(period_start, installment.due_date) {
                    details.push(PaidDetail {
                        installment_index,
                        amount: charge.amount.min(transaction.amount),
                    });
                    break;
                }
            }
            period_start = installment.due_date;
        }

        transaction.reset_derived_components();
        // the pass below must never settle charges the transaction was not
        // linked to, even when an earlier-due unpaid charge exists
        let linked = transaction.paying_charges.clone();
        let mut unprocessed = transaction.amount;
        for paid_detail in details {
            let to_process = paid_detail.amount.min(unprocessed);
            let leftover = self.allocate_components(
                transaction,
                currency,
                installments,
                paid_detail.installment_index..paid_detail.installment_index + 1,
                to_process,
                charges,
                Some(&linked),
                events,
            )?;
            unprocessed -= to_process - leftover;
            if !unprocessed.is_positive() {
                break;
            }
        }

        if unprocessed.is_positive() {
            self.strategy.on_overpayment(transaction, unprocessed);
            transaction.record_overpayment(unprocessed);
            events.emit(AllocationEvent::LoanOverpaid {
                loan_id: transaction.loan_id,
                transaction_date: transaction.date,
                amount: unprocessed,
            });
        }
        events.emit(AllocationEvent::PaymentAllocated {
            loan_id: transaction.loan_id,
            transaction_date: transaction.date,
            amount: transaction.amount,
            allocation: transaction.breakdown(),
            overpayment: transaction.overpayment_portion,
        });
        Ok(())
    }

    /// Single-transaction allocation: installment walk, charge pass, then
    /// leftover disposition (waivers shrink, everything else surfaces the
    /// overpayment hook).
    #[allow(clippy::too_many_arguments)]
    fn allocate_transaction(
        &self,
        transaction: &mut Transaction,
        currency: &Currency,
        installments: &mut [Installment],
        range: Range<usize>,
        amount: Money,
        charges: &mut [Charge],
        events: &mut EventStore,
    ) -> Result<()> {
        let leftover = self.allocate_components(
            transaction,
            currency,
            installments,
            range,
            amount,
            charges,
            None,
            events,
        )?;

        if leftover.is_positive() {
            if transaction.is_interest_waiver() {
                // a waiver cannot overpay; it forgives what was forgivable
                transaction.shrink_to_allocated();
            } else {
                self.strategy.on_overpayment(transaction, leftover);
                transaction.record_overpayment(leftover);
                events.emit(AllocationEvent::LoanOverpaid {
                    loan_id: transaction.loan_id,
                    transaction_date: transaction.date,
                    amount: leftover,
                });
            }
        }

        if transaction.is_interest_waiver() {
            events.emit(AllocationEvent::InterestWaived {
                loan_id: transaction.loan_id,
                transaction_date: transaction.date,
                waived: transaction.interest_portion,
            });
        } else {
            events.emit(AllocationEvent::PaymentAllocated {
                loan_id: transaction.loan_id,
                transaction_date: transaction.date,
                amount: transaction.amount,
                allocation: transaction.breakdown(),
                overpayment: transaction.overpayment_portion,
            });
        }
        Ok(())
    }

    /// installment walk followed by the fee/penalty charge pass over the
    /// portions this call consumed; `eligible` restricts the charge pass to
    /// a transaction's linked charges
    #[allow(clippy::too_many_arguments)]
    fn allocate_components(
        &self,
        transaction: &mut Transaction,
        _currency: &Currency,
        installments: &mut [Installment],
        range: Range<usize>,
        amount: Money,
        charges: &mut [Charge],
        eligible: Option<&[ChargeId]>,
        events: &mut EventStore,
    ) -> Result<Money> {
        if transaction.is_repayment() || transaction.is_interest_waiver() {
            transaction.reset_derived_components();
        }

        let fee_before = transaction.fee_portion;
        let penalty_before = transaction.penalty_portion;

        let unprocessed = self.walk_installments(transaction, installments, range, amount)?;

        if !transaction.is_interest_waiver() {
            let fee_consumed = transaction.fee_portion - fee_before;
            let penalty_consumed = transaction.penalty_portion - penalty_before;
            if fee_consumed.is_positive() {
                self.allocate_to_charges(
                    transaction,
                    fee_consumed,
                    ChargeKind::Fee,
                    charges,
                    eligible,
                    events,
                );
            }
            if penalty_consumed.is_positive() {
                self.allocate_to_charges(
                    transaction,
                    penalty_consumed,
                    ChargeKind::Penalty,
                    charges,
                    eligible,
                    events,
                );
            }
        }

        Ok(unprocessed)
    }

    /// Walk the given installments in due-date order, classifying the
    /// transaction against each open installment and dispatching to the
    /// strategy. Classification is strict: before the due date is advance,
    /// after is late, the due date itself is on time.
    fn walk_installments(
        &self,
        transaction: &mut Transaction,
        installments: &mut [Installment],
        range: Range<usize>,
        amount: Money,
    ) -> Result<Money> {
        let transaction_date = transaction.date;
        let mut remaining = amount;

        for index in range {
            if !remaining.is_positive() {
                break;
            }
            if !installments[index].is_not_fully_paid_off() {
                continue;
            }
            let due_date = installments[index].due_date;
            remaining = if transaction_date < due_date {
                self.strategy.advance_payment(
                    installments,
                    index,
                    transaction,
                    transaction_date,
                    remaining,
                )
            } else if transaction_date > due_date {
                self.strategy
                    .late_payment(installments, index, transaction, remaining)
            } else {
                self.strategy
                    .on_time_payment(installments, index, transaction, remaining)
            };
            if remaining.is_negative() {
                return Err(AllocationError::NegativeRemaining { remaining });
            }
        }
        Ok(remaining)
    }

    /// consume an already-computed fee/penalty portion against outstanding
    /// charges of that kind, earliest due date first; `eligible` narrows
    /// the candidates to a charge-payment's linked charges
    #[allow(clippy::too_many_arguments)]
    fn allocate_to_charges(
        &self,
        transaction: &mut Transaction,
        amount: Money,
        kind: ChargeKind,
        charges: &mut [Charge],
        eligible: Option<&[ChargeId]>,
        events: &mut EventStore,
    ) {
        let mut remaining = amount;
        while remaining.is_positive() {
            let Some(index) = earliest_unpaid_charge(charges, kind, eligible) else {
                break;
            };
            let consumed = charges[index].update_paid_amount_by(remaining);
            if !consumed.is_positive() {
                break;
            }
            transaction.record_charge_paid(charges[index].id, consumed);
            events.emit(AllocationEvent::ChargePaid {
                loan_id: transaction.loan_id,
                charge_id: charges[index].id,
                amount: consumed,
            });
            remaining -= consumed;
        }
    }
}

/// Earliest-due tie-break over not-fully-paid, non-disbursement charges of
/// one kind: smallest due date wins, ties broken by creation sequence so
/// the pick never depends on container order. When `eligible` is given,
/// only the listed charges are candidates.
fn earliest_unpaid_charge(
    charges: &[Charge],
    kind: ChargeKind,
    eligible: Option<&[ChargeId]>,
) -> Option<usize> {
    charges
        .iter()
        .enumerate()
        .filter(|(_, charge)| {
            charge.kind == kind && charge.is_not_fully_paid() && !charge.is_due_at_disbursement()
        })
        .filter(|(_, charge)| eligible.map_or(true, |ids| ids.contains(&charge.id)))
        .min_by_key(|(_, charge)| (charge.due_date(), charge.sequence))
        .map(|(index, _)| index)
}

/// Fail fast on caller-supplied state that breaks component accounting.
/// This is a contract check, not a recovery path: a violation aborts the
/// enclosing operation.
fn validate_inputs(
    transactions: &[Transaction],
    installments: &[Installment],
    charges: &[Charge],
) -> Result<()> {
    for transaction in transactions {
        if transaction.amount.is_negative() {
            return Err(AllocationError::InvalidTransactionAmount {
                amount: transaction.amount,
            });
        }
    }
    for installment in installments {
        if installment.principal_due.is_negative() || installment.interest_due.is_negative() {
            return Err(AllocationError::InvalidScheduleState {
                installment: installment.number,
                message: "negative due amount".to_string(),
            });
        }
        let accounted = installment.principal_paid + installment.principal_written_off;
        if accounted > installment.principal_due {
            return Err(AllocationError::InvalidScheduleState {
                installment: installment.number,
                message: format!(
                    "principal accounted {} exceeds due {}",
                    accounted, installment.principal_due
                ),
            });
        }
        let accounted = installment.interest_paid
            + installment.interest_waived
            + installment.interest_written_off;
        if accounted > installment.interest_due {
            return Err(AllocationError::InvalidScheduleState {
                installment: installment.number,
                message: format!(
                    "interest accounted {} exceeds due {}",
                    accounted, installment.interest_due
                ),
            });
        }
    }
    for charge in charges {
        if charge.amount.is_negative() || charge.outstanding().is_negative() {
            return Err(AllocationError::InvalidChargeState {
                message: format!(
                    "charge {} accounting exceeds its amount {}",
                    charge.name, charge.amount
                ),
            });
        }
    }
    Ok(())
}
