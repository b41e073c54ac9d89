use crate::application::ledger::LedgerService;
use crate::domain::money::Amount;
use crate::domain::order::Order;
use crate::domain::package::Package;
use crate::domain::policy::{authorize, Actor, Operation};
use crate::domain::ports::{CommitSet, DatastoreRef, VersionedWrite};
use crate::domain::wallet::Direction;
use crate::domain::{OrderId, PackageId};
use crate::error::{CoreError, Result};
use std::time::Duration;
use tracing::{info, warn};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 10;

pub const REASON_ORDER_PAYMENT: &str = "order payment";
pub const REASON_ORDER_REFUND: &str = "order refund";
pub const REASON_CUSTOMS_PAYMENT: &str = "customs payment";

/// The only component allowed to mutate a wallet and an order/package in one
/// logical operation. Every mutation is staged against a snapshot and then
/// submitted as a single version-checked commit; a lost race is retried a
/// bounded number of times before surfacing `ConcurrentModification`.
#[derive(Clone)]
pub struct TransactionCoordinator {
    store: DatastoreRef,
    ledger: LedgerService,
}

impl TransactionCoordinator {
    pub fn new(store: DatastoreRef, ledger: LedgerService) -> Self {
        Self { store, ledger }
    }

    async fn backoff(attempt: u32) {
        tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
    }

    /// Debits the owner's wallet by the order total and moves the order from
    /// AWAITING_PAYMENT to ORDERING, atomically. Any failure leaves both the
    /// wallet and the order untouched.
    pub async fn pay_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut order = self
                .store
                .order(order_id)
                .await?
                .ok_or(CoreError::NotFound("order"))?;
            authorize(actor, order.owner, None, Operation::PayOrder)?;

            let expected = order.version;
            order.mark_paid()?;
            order.version += 1;

            let total = order
                .total_amount
                .ok_or_else(|| CoreError::InvalidAmount("order has no price".into()))?;

            let wallet = self.ledger.get_or_create_wallet(order.owner).await?;
            let staged = self
                .ledger
                .stage(&wallet, total, Direction::Debit, REASON_ORDER_PAYMENT)
                .await?;

            let set = CommitSet::new()
                .wallet(staged.wallet)
                .entry(staged.entry)
                .order(VersionedWrite::update(order.clone(), expected));

            match self.store.commit(set).await {
                Ok(()) => {
                    info!(order_id, amount = %total, "order paid");
                    return Ok(order);
                }
                Err(CoreError::ConcurrentModification) if attempt < MAX_ATTEMPTS => {
                    warn!(order_id, attempt, "pay_order lost a race, retrying");
                    Self::backoff(attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(CoreError::ConcurrentModification)
    }

    /// Cancels an order; when it was already paid, the compensating credit is
    /// committed together with the status change.
    pub async fn cancel_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut order = self
                .store
                .order(order_id)
                .await?
                .ok_or(CoreError::NotFound("order"))?;
            authorize(actor, order.owner, None, Operation::CancelOrder)?;

            let expected = order.version;
            let refund = order.cancel()?;
            order.version += 1;

            let mut set =
                CommitSet::new().order(VersionedWrite::update(order.clone(), expected));
            if let Some(amount) = refund {
                let wallet = self.ledger.get_or_create_wallet(order.owner).await?;
                let staged = self
                    .ledger
                    .stage(&wallet, amount, Direction::Credit, REASON_ORDER_REFUND)
                    .await?;
                set = set.wallet(staged.wallet).entry(staged.entry);
            }

            match self.store.commit(set).await {
                Ok(()) => {
                    info!(order_id, refunded = refund.is_some(), "order cancelled");
                    return Ok(order);
                }
                Err(CoreError::ConcurrentModification) if attempt < MAX_ATTEMPTS => {
                    warn!(order_id, attempt, "cancel_order lost a race, retrying");
                    Self::backoff(attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(CoreError::ConcurrentModification)
    }

    /// Debits the package owner's wallet and increments `customs_paid` in one
    /// commit.
    pub async fn pay_customs(
        &self,
        actor: &Actor,
        package_id: PackageId,
        amount: Amount,
    ) -> Result<Package> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut package = self
                .store
                .package(package_id)
                .await?
                .ok_or(CoreError::NotFound("package"))?;
            authorize(actor, package.owner, package.shop, Operation::PayCustoms)?;

            let expected = package.version;
            package.record_customs_payment(amount)?;
            package.version += 1;

            let wallet = self.ledger.get_or_create_wallet(package.owner).await?;
            let staged = self
                .ledger
                .stage(&wallet, amount, Direction::Debit, REASON_CUSTOMS_PAYMENT)
                .await?;

            let set = CommitSet::new()
                .wallet(staged.wallet)
                .entry(staged.entry)
                .package(VersionedWrite::update(package.clone(), expected));

            match self.store.commit(set).await {
                Ok(()) => {
                    info!(package_id, amount = %amount, "customs paid");
                    return Ok(package);
                }
                Err(CoreError::ConcurrentModification) if attempt < MAX_ATTEMPTS => {
                    warn!(package_id, attempt, "pay_customs lost a race, retrying");
                    Self::backoff(attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(CoreError::ConcurrentModification)
    }
}
