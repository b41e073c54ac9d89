use crate::domain::account::Account;
use crate::domain::order::Order;
use crate::domain::package::Package;
use crate::domain::ports::{CommitSet, Datastore, VersionedWrite};
use crate::domain::wallet::{Wallet, WalletEntry};
use crate::domain::{AccountId, OrderId, PackageId, WalletId};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const CF_ACCOUNTS: &str = "accounts";
pub const CF_WALLETS: &str = "wallets";
pub const CF_ORDERS: &str = "orders";
pub const CF_PACKAGES: &str = "packages";
pub const CF_ENTRIES: &str = "entries";
pub const CF_META: &str = "meta";

const NEXT_ID_KEY: &[u8] = b"next_id";

/// Persistent datastore on RocksDB, one column family per entity kind.
/// Version checks and batch application happen under a single write mutex;
/// the batch itself makes the writes land together.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

fn internal(err: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(err.to_string())
}

impl RocksDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [
            CF_ACCOUNTS,
            CF_WALLETS,
            CF_ORDERS,
            CF_PACKAGES,
            CF_ENTRIES,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs).map_err(internal)?;
        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(cf, key).map_err(internal)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(internal)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item.map_err(internal)?;
            out.push(serde_json::from_slice(&value).map_err(internal)?);
        }
        Ok(out)
    }

    fn put_json<T: Serialize>(batch: &mut WriteBatch, cf: &rocksdb::ColumnFamily, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(internal)?;
        batch.put_cf(cf, key, bytes);
        Ok(())
    }

    fn stored_version<T, F>(&self, cf: &str, key: &[u8], version: F) -> Result<Option<u64>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> u64,
    {
        Ok(self.get_json::<T>(cf, key)?.map(|entity| version(&entity)))
    }

    fn check_version<T>(current: Option<u64>, write: &VersionedWrite<T>) -> Result<()> {
        match (current, write.expected) {
            (None, None) => Ok(()),
            (Some(cur), Some(exp)) if cur == exp => Ok(()),
            _ => Err(CoreError::ConcurrentModification),
        }
    }

    /// Entry keys sort by wallet then insertion id, so a prefix scan yields
    /// one wallet's history oldest first.
    fn entry_key(entry: &WalletEntry) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&entry.wallet_id.to_be_bytes());
        key[8..].copy_from_slice(&entry.id.to_be_bytes());
        key
    }
}

#[async_trait]
impl Datastore for RocksDbStore {
    async fn allocate_id(&self) -> Result<u64> {
        let _guard = self.write_guard.lock().map_err(|_| internal("poisoned lock"))?;
        let cf = self.cf(CF_META)?;
        let next = match self.db.get_cf(cf, NEXT_ID_KEY).map_err(internal)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| internal("corrupt id counter"))?;
                u64::from_be_bytes(arr) + 1
            }
            None => 1,
        };
        self.db
            .put_cf(cf, NEXT_ID_KEY, next.to_be_bytes())
            .map_err(internal)?;
        Ok(next)
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, &id.to_be_bytes())
    }

    async fn store_account(&self, account: Account) -> Result<()> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let bytes = serde_json::to_vec(&account).map_err(internal)?;
        self.db
            .put_cf(cf, account.id.to_be_bytes(), bytes)
            .map_err(internal)?;
        Ok(())
    }

    async fn wallet_by_account(&self, account_id: AccountId) -> Result<Option<Wallet>> {
        Ok(self
            .scan_json::<Wallet>(CF_WALLETS)?
            .into_iter()
            .find(|w| w.account_id == account_id))
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let mut wallets = self.scan_json::<Wallet>(CF_WALLETS)?;
        wallets.sort_by_key(|w| w.id);
        Ok(wallets)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &id.to_be_bytes())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let mut orders = self.scan_json::<Order>(CF_ORDERS)?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn package(&self, id: PackageId) -> Result<Option<Package>> {
        self.get_json(CF_PACKAGES, &id.to_be_bytes())
    }

    async fn all_packages(&self) -> Result<Vec<Package>> {
        let mut packages = self.scan_json::<Package>(CF_PACKAGES)?;
        packages.sort_by_key(|p| p.id);
        Ok(packages)
    }

    async fn entries(&self, wallet_id: WalletId) -> Result<Vec<WalletEntry>> {
        let mut entries: Vec<WalletEntry> = self
            .scan_json::<WalletEntry>(CF_ENTRIES)?
            .into_iter()
            .filter(|e| e.wallet_id == wallet_id)
            .collect();
        entries.sort_by_key(|e| e.id);
        entries.reverse();
        Ok(entries)
    }

    async fn commit(&self, set: CommitSet) -> Result<()> {
        let _guard = self.write_guard.lock().map_err(|_| internal("poisoned lock"))?;

        if let Some(write) = &set.wallet {
            let current = self.stored_version::<Wallet, _>(
                CF_WALLETS,
                &write.entity.id.to_be_bytes(),
                |w| w.version,
            )?;
            Self::check_version(current, write)?;
            // One wallet per account: a lazy-create that lost the race fails
            // here and re-reads.
            if write.expected.is_none()
                && self
                    .scan_json::<Wallet>(CF_WALLETS)?
                    .iter()
                    .any(|w| w.account_id == write.entity.account_id)
            {
                return Err(CoreError::ConcurrentModification);
            }
        }
        if let Some(write) = &set.order {
            let current = self.stored_version::<Order, _>(
                CF_ORDERS,
                &write.entity.id.to_be_bytes(),
                |o| o.version,
            )?;
            Self::check_version(current, write)?;
        }
        if let Some(write) = &set.package {
            let current = self.stored_version::<Package, _>(
                CF_PACKAGES,
                &write.entity.id.to_be_bytes(),
                |p| p.version,
            )?;
            Self::check_version(current, write)?;
        }

        let mut batch = WriteBatch::default();
        if let Some(write) = &set.wallet {
            let cf = self.cf(CF_WALLETS)?;
            Self::put_json(&mut batch, cf, &write.entity.id.to_be_bytes(), &write.entity)?;
        }
        if let Some(entry) = &set.entry {
            let cf = self.cf(CF_ENTRIES)?;
            Self::put_json(&mut batch, cf, &Self::entry_key(entry), entry)?;
        }
        if let Some(write) = &set.order {
            let cf = self.cf(CF_ORDERS)?;
            Self::put_json(&mut batch, cf, &write.entity.id.to_be_bytes(), &write.entity)?;
        }
        if let Some(write) = &set.package {
            let cf = self.cf(CF_PACKAGES)?;
            Self::put_json(&mut batch, cf, &write.entity.id.to_be_bytes(), &write.entity)?;
        }
        self.db.write(batch).map_err(internal)?;
        Ok(())
    }
}
