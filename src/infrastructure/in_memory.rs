use crate::domain::account::Account;
use crate::domain::order::Order;
use crate::domain::package::Package;
use crate::domain::ports::{CommitSet, Datastore, VersionedWrite};
use crate::domain::wallet::{Wallet, WalletEntry};
use crate::domain::{AccountId, OrderId, PackageId, WalletId};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    next_id: u64,
    accounts: HashMap<AccountId, Account>,
    wallets: HashMap<WalletId, Wallet>,
    orders: HashMap<OrderId, Order>,
    packages: HashMap<PackageId, Package>,
    // Append-only; per-wallet views are filtered out of this.
    entries: Vec<WalletEntry>,
}

fn check_version<T>(current: Option<u64>, write: &VersionedWrite<T>) -> Result<()> {
    match (current, write.expected) {
        (None, None) => Ok(()),
        (Some(cur), Some(exp)) if cur == exp => Ok(()),
        _ => Err(CoreError::ConcurrentModification),
    }
}

/// In-memory datastore backed by a single `RwLock`. Holding the write lock
/// across the whole of `commit` gives the all-or-nothing and version-check
/// semantics the coordinator relies on.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for InMemoryStore {
    async fn allocate_id(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        Ok(state.next_id)
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn store_account(&self, account: Account) -> Result<()> {
        let mut state = self.state.write().await;
        state.accounts.insert(account.id, account);
        Ok(())
    }

    async fn wallet_by_account(&self, account_id: AccountId) -> Result<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state
            .wallets
            .values()
            .find(|w| w.account_id == account_id)
            .cloned())
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let state = self.state.read().await;
        let mut wallets: Vec<_> = state.wallets.values().cloned().collect();
        wallets.sort_by_key(|w| w.id);
        Ok(wallets)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn package(&self, id: PackageId) -> Result<Option<Package>> {
        let state = self.state.read().await;
        Ok(state.packages.get(&id).cloned())
    }

    async fn all_packages(&self) -> Result<Vec<Package>> {
        let state = self.state.read().await;
        let mut packages: Vec<_> = state.packages.values().cloned().collect();
        packages.sort_by_key(|p| p.id);
        Ok(packages)
    }

    async fn entries(&self, wallet_id: WalletId) -> Result<Vec<WalletEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }

    async fn commit(&self, set: CommitSet) -> Result<()> {
        let mut state = self.state.write().await;

        // Validate every version before touching anything.
        if let Some(write) = &set.wallet {
            let current = state.wallets.get(&write.entity.id).map(|w| w.version);
            check_version(current, write)?;
            // One wallet per account: a lazy-create that lost the race fails
            // here and re-reads.
            if write.expected.is_none()
                && state
                    .wallets
                    .values()
                    .any(|w| w.account_id == write.entity.account_id)
            {
                return Err(CoreError::ConcurrentModification);
            }
        }
        if let Some(write) = &set.order {
            let current = state.orders.get(&write.entity.id).map(|o| o.version);
            check_version(current, write)?;
        }
        if let Some(write) = &set.package {
            let current = state.packages.get(&write.entity.id).map(|p| p.version);
            check_version(current, write)?;
        }

        if let Some(write) = set.wallet {
            state.wallets.insert(write.entity.id, write.entity);
        }
        if let Some(entry) = set.entry {
            state.entries.push(entry);
        }
        if let Some(write) = set.order {
            state.orders.insert(write.entity.id, write.entity);
        }
        if let Some(write) = set.package {
            state.packages.insert(write.entity.id, write.entity);
        }
        Ok(())
    }
}
