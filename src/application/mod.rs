//! Application layer: the ledger service, the transaction coordinator that
//! makes "debit wallet" and "advance status" one atomic unit, and the
//! `CoreService` facade the (excluded) HTTP layer calls into.

pub mod coordinator;
pub mod ledger;
pub mod service;
