use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{CommitSet, DatastoreRef, VersionedWrite};
use crate::domain::wallet::{Direction, Wallet, WalletEntry};
use crate::domain::AccountId;
use crate::error::{CoreError, Result};

/// A validated but not yet persisted ledger mutation: the updated wallet row
/// and the entry that justifies it. Callers put both into one commit, so the
/// balance cache and the audit trail can never diverge.
pub struct StagedEntry {
    pub wallet: VersionedWrite<Wallet>,
    pub entry: WalletEntry,
}

/// Owns wallet balances and the append-only entry history.
#[derive(Clone)]
pub struct LedgerService {
    store: DatastoreRef,
}

impl LedgerService {
    pub fn new(store: DatastoreRef) -> Self {
        Self { store }
    }

    /// Returns the account's wallet, creating an empty one on first use.
    /// This is the documented side-effecting read: a GET on a fresh account
    /// materializes a zero-balance wallet.
    pub async fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet> {
        if let Some(wallet) = self.store.wallet_by_account(account_id).await? {
            return Ok(wallet);
        }
        let id = self.store.allocate_id().await?;
        let wallet = Wallet::new(id, account_id);
        match self
            .store
            .commit(CommitSet::new().wallet(VersionedWrite::insert(wallet.clone())))
            .await
        {
            Ok(()) => Ok(wallet),
            // Someone else created it between our read and write.
            Err(CoreError::ConcurrentModification) => self
                .store
                .wallet_by_account(account_id)
                .await?
                .ok_or(CoreError::NotFound("wallet")),
            Err(err) => Err(err),
        }
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<Balance> {
        Ok(self.get_or_create_wallet(account_id).await?.balance)
    }

    /// Ledger history, newest first.
    pub async fn entries(&self, account_id: AccountId) -> Result<Vec<WalletEntry>> {
        let wallet = self.get_or_create_wallet(account_id).await?;
        self.store.entries(wallet.id).await
    }

    /// Validates and stages one ledger mutation against a wallet snapshot.
    /// Fails with `InsufficientFunds` before anything is written; the commit
    /// itself is the caller's job.
    pub async fn stage(
        &self,
        wallet: &Wallet,
        amount: Amount,
        direction: Direction,
        reason: &str,
    ) -> Result<StagedEntry> {
        let mut updated = wallet.clone();
        updated.apply(amount, direction)?;
        updated.version += 1;

        let entry_id = self.store.allocate_id().await?;
        let entry = WalletEntry::new(entry_id, wallet.id, amount, direction, reason);

        Ok(StagedEntry {
            wallet: VersionedWrite::update(updated, wallet.version),
            entry,
        })
    }

    /// Stand-alone credit (staff top-ups). Combined wallet+status operations
    /// go through the transaction coordinator instead.
    pub async fn credit(
        &self,
        account_id: AccountId,
        amount: Amount,
        reason: &str,
    ) -> Result<Wallet> {
        let wallet = self.get_or_create_wallet(account_id).await?;
        let staged = self.stage(&wallet, amount, Direction::Credit, reason).await?;
        let updated = staged.wallet.entity.clone();
        self.store
            .commit(CommitSet::new().wallet(staged.wallet).entry(staged.entry))
            .await?;
        Ok(updated)
    }
}
