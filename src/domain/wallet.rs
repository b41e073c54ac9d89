use crate::domain::money::{Amount, Balance};
use crate::domain::{now_millis, AccountId, EntryId, WalletId};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Credit,
    Debit,
}

/// An immutable ledger record. Once written it is never mutated or deleted;
/// the wallet balance is a materialized cache of the sum of these.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WalletEntry {
    pub id: EntryId,
    pub wallet_id: WalletId,
    pub amount: Amount,
    pub direction: Direction,
    pub reason: String,
    pub created_at: u64,
}

impl WalletEntry {
    pub fn new(
        id: EntryId,
        wallet_id: WalletId,
        amount: Amount,
        direction: Direction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id,
            wallet_id,
            amount,
            direction,
            reason: reason.into(),
            created_at: now_millis(),
        }
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount.value(),
            Direction::Debit => -self.amount.value(),
        }
    }
}

/// A per-account prepaid balance. `version` backs the optimistic concurrency
/// check in the datastore commit.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub account_id: AccountId,
    pub balance: Balance,
    pub version: u64,
    pub updated_at: u64,
}

impl Wallet {
    pub fn new(id: WalletId, account_id: AccountId) -> Self {
        Self {
            id,
            account_id,
            balance: Balance::ZERO,
            version: 0,
            updated_at: now_millis(),
        }
    }

    /// Applies a ledger entry to the cached balance. The caller persists the
    /// updated wallet and the entry in the same atomic commit.
    pub fn apply(&mut self, amount: Amount, direction: Direction) -> Result<()> {
        self.balance = match direction {
            Direction::Credit => self.balance.credit(amount),
            Direction::Debit => self.balance.debit(amount)?,
        };
        self.updated_at = now_millis();
        Ok(())
    }
}
