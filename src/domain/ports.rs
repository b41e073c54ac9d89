use crate::domain::account::Account;
use crate::domain::order::Order;
use crate::domain::package::Package;
use crate::domain::wallet::{Wallet, WalletEntry};
use crate::domain::{AccountId, OrderId, PackageId, WalletId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A version-checked write. `expected` is the version the caller read;
/// `None` means the row must not exist yet (insert). The stored entity
/// carries the already-bumped version.
#[derive(Debug, Clone)]
pub struct VersionedWrite<T> {
    pub entity: T,
    pub expected: Option<u64>,
}

impl<T> VersionedWrite<T> {
    pub fn insert(entity: T) -> Self {
        Self {
            entity,
            expected: None,
        }
    }

    pub fn update(entity: T, expected: u64) -> Self {
        Self {
            entity,
            expected: Some(expected),
        }
    }
}

/// The unit of atomicity: every field present is applied together or not at
/// all, after all version checks pass. This is what makes "debit wallet" and
/// "advance status" inseparable.
#[derive(Debug, Clone, Default)]
pub struct CommitSet {
    pub wallet: Option<VersionedWrite<Wallet>>,
    pub entry: Option<WalletEntry>,
    pub order: Option<VersionedWrite<Order>>,
    pub package: Option<VersionedWrite<Package>>,
}

impl CommitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallet(mut self, write: VersionedWrite<Wallet>) -> Self {
        self.wallet = Some(write);
        self
    }

    pub fn entry(mut self, entry: WalletEntry) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn order(mut self, write: VersionedWrite<Order>) -> Self {
        self.order = Some(write);
        self
    }

    pub fn package(mut self, write: VersionedWrite<Package>) -> Self {
        self.package = Some(write);
        self
    }
}

/// Storage port. Reads are plain consistent snapshots; all writes except
/// account upserts go through `commit`, which fails with
/// `ConcurrentModification` when any version check loses a race.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Allocates the next id from a store-wide monotonic sequence.
    async fn allocate_id(&self) -> Result<u64>;

    async fn account(&self, id: AccountId) -> Result<Option<Account>>;
    async fn store_account(&self, account: Account) -> Result<()>;

    async fn wallet_by_account(&self, account_id: AccountId) -> Result<Option<Wallet>>;
    async fn all_wallets(&self) -> Result<Vec<Wallet>>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;

    async fn package(&self, id: PackageId) -> Result<Option<Package>>;
    async fn all_packages(&self) -> Result<Vec<Package>>;

    /// Ledger history for one wallet, newest first.
    async fn entries(&self, wallet_id: WalletId) -> Result<Vec<WalletEntry>>;

    /// Applies the whole set atomically, or nothing.
    async fn commit(&self, set: CommitSet) -> Result<()>;
}

pub type DatastoreRef = Arc<dyn Datastore>;
