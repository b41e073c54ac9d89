use crate::application::coordinator::TransactionCoordinator;
use crate::application::ledger::LedgerService;
use crate::domain::account::{Account, Role};
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{NewOrder, Order};
use crate::domain::package::{Package, PackageStatus};
use crate::domain::policy::{authorize, Actor, Operation};
use crate::domain::ports::{CommitSet, DatastoreRef, VersionedWrite};
use crate::domain::wallet::WalletEntry;
use crate::domain::{AccountId, OrderId, PackageId};
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use tracing::info;

/// Balance plus the history that justifies it.
#[derive(Debug, Clone)]
pub struct WalletView {
    pub balance: Balance,
    pub entries: Vec<WalletEntry>,
}

/// The facade the excluded UI layer calls. Each operation authorizes first,
/// then either mutates through a single version-checked commit or delegates
/// to the transaction coordinator when a wallet is involved.
#[derive(Clone)]
pub struct CoreService {
    store: DatastoreRef,
    ledger: LedgerService,
    coordinator: TransactionCoordinator,
}

impl CoreService {
    pub fn new(store: DatastoreRef) -> Self {
        let ledger = LedgerService::new(store.clone());
        let coordinator = TransactionCoordinator::new(store.clone(), ledger.clone());
        Self {
            store,
            ledger,
            coordinator,
        }
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    async fn require_account(&self, id: AccountId) -> Result<Account> {
        self.store
            .account(id)
            .await?
            .ok_or(CoreError::NotFound("account"))
    }

    async fn require_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .order(id)
            .await?
            .ok_or(CoreError::NotFound("order"))
    }

    async fn require_package(&self, id: PackageId) -> Result<Package> {
        self.store
            .package(id)
            .await?
            .ok_or(CoreError::NotFound("package"))
    }

    pub async fn create_account(&self, role: Role) -> Result<Account> {
        let id = self.store.allocate_id().await?;
        let account = Account::new(id, role);
        self.store.store_account(account.clone()).await?;
        info!(account_id = id, ?role, "account created");
        Ok(account)
    }

    /// Registers an account under a caller-chosen id. The surrounding app
    /// creates accounts at signup with ids from its own auth system.
    pub async fn register_account(&self, id: AccountId, role: Role) -> Result<Account> {
        let account = Account::new(id, role);
        self.store.store_account(account.clone()).await?;
        Ok(account)
    }

    pub async fn create_order(&self, actor: &Actor, params: NewOrder) -> Result<Order> {
        authorize(actor, params.owner, None, Operation::CreateOrder)?;
        self.require_account(params.owner).await?;

        let id = self.store.allocate_id().await?;
        let order = Order::create(id, params);
        self.store
            .commit(CommitSet::new().order(VersionedWrite::insert(order.clone())))
            .await?;
        info!(order_id = id, order_number = %order.order_number, "order created");
        Ok(order)
    }

    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        let order = self.require_order(order_id).await?;
        authorize(actor, order.owner, None, Operation::ReadOrder)?;
        Ok(order)
    }

    pub async fn set_order_price(
        &self,
        actor: &Actor,
        order_id: OrderId,
        total: Amount,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        authorize(actor, order.owner, None, Operation::PriceOrder)?;

        let expected = order.version;
        order.set_price(total)?;
        order.version += 1;
        self.store
            .commit(CommitSet::new().order(VersionedWrite::update(order.clone(), expected)))
            .await?;
        Ok(order)
    }

    /// Approval prices the order in the same call; an order may not sit in
    /// AWAITING_PAYMENT without a total.
    pub async fn approve_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        total: Amount,
    ) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        authorize(actor, order.owner, None, Operation::ApproveOrder)?;

        let expected = order.version;
        order.approve(total)?;
        order.version += 1;
        self.store
            .commit(CommitSet::new().order(VersionedWrite::update(order.clone(), expected)))
            .await?;
        info!(order_id, total = %total, "order approved");
        Ok(order)
    }

    pub async fn pay_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        self.coordinator.pay_order(actor, order_id).await
    }

    pub async fn complete_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        let mut order = self.require_order(order_id).await?;
        authorize(actor, order.owner, None, Operation::CompleteOrder)?;

        let expected = order.version;
        order.complete()?;
        order.version += 1;
        self.store
            .commit(CommitSet::new().order(VersionedWrite::update(order.clone(), expected)))
            .await?;
        info!(order_id, "order completed");
        Ok(order)
    }

    pub async fn cancel_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        self.coordinator.cancel_order(actor, order_id).await
    }

    pub async fn create_package(
        &self,
        actor: &Actor,
        owner: AccountId,
        shop: Option<AccountId>,
        description: Option<String>,
    ) -> Result<Package> {
        authorize(actor, owner, shop, Operation::CreatePackage)?;
        self.require_account(owner).await?;
        if let Some(shop_id) = shop {
            self.require_account(shop_id).await?;
        }

        let id = self.store.allocate_id().await?;
        let package = Package::create(id, owner, shop, description);
        self.store
            .commit(CommitSet::new().package(VersionedWrite::insert(package.clone())))
            .await?;
        info!(package_id = id, tracking = %package.tracking_number, "package created");
        Ok(package)
    }

    pub async fn get_package(&self, actor: &Actor, package_id: PackageId) -> Result<Package> {
        let package = self.require_package(package_id).await?;
        authorize(actor, package.owner, package.shop, Operation::ReadPackage)?;
        Ok(package)
    }

    pub async fn set_customs_fee(
        &self,
        actor: &Actor,
        package_id: PackageId,
        fee: Decimal,
    ) -> Result<Package> {
        let mut package = self.require_package(package_id).await?;
        authorize(actor, package.owner, package.shop, Operation::SetCustomsFee)?;

        let expected = package.version;
        package.set_customs_fee(fee)?;
        package.version += 1;
        self.store
            .commit(CommitSet::new().package(VersionedWrite::update(package.clone(), expected)))
            .await?;
        info!(package_id, %fee, "customs fee set");
        Ok(package)
    }

    pub async fn pay_customs(
        &self,
        actor: &Actor,
        package_id: PackageId,
        amount: Amount,
    ) -> Result<Package> {
        self.coordinator.pay_customs(actor, package_id, amount).await
    }

    pub async fn advance_package(
        &self,
        actor: &Actor,
        package_id: PackageId,
        next: PackageStatus,
    ) -> Result<Package> {
        let mut package = self.require_package(package_id).await?;
        authorize(
            actor,
            package.owner,
            package.shop,
            Operation::AdvancePackage(next),
        )?;

        let expected = package.version;
        package.advance(next)?;
        package.version += 1;
        self.store
            .commit(CommitSet::new().package(VersionedWrite::update(package.clone(), expected)))
            .await?;
        info!(package_id, status = %next, "package advanced");
        Ok(package)
    }

    pub async fn reassign_shop(
        &self,
        actor: &Actor,
        package_id: PackageId,
        shop: Option<AccountId>,
    ) -> Result<Package> {
        let mut package = self.require_package(package_id).await?;
        authorize(actor, package.owner, package.shop, Operation::ReassignShop)?;
        if let Some(shop_id) = shop {
            self.require_account(shop_id).await?;
        }

        let expected = package.version;
        package.reassign_shop(shop)?;
        package.version += 1;
        self.store
            .commit(CommitSet::new().package(VersionedWrite::update(package.clone(), expected)))
            .await?;
        Ok(package)
    }

    pub async fn get_wallet(&self, actor: &Actor, account_id: AccountId) -> Result<WalletView> {
        authorize(actor, account_id, None, Operation::ReadWallet)?;
        self.require_account(account_id).await?;
        Ok(WalletView {
            balance: self.ledger.balance(account_id).await?,
            entries: self.ledger.entries(account_id).await?,
        })
    }

    /// Staff top-up; the only way money enters the system.
    pub async fn credit_wallet(
        &self,
        actor: &Actor,
        account_id: AccountId,
        amount: Amount,
        reason: &str,
    ) -> Result<WalletView> {
        authorize(actor, account_id, None, Operation::CreditWallet)?;
        self.require_account(account_id).await?;
        self.ledger.credit(account_id, amount, reason).await?;
        info!(account_id, amount = %amount, "wallet credited");
        Ok(WalletView {
            balance: self.ledger.balance(account_id).await?,
            entries: self.ledger.entries(account_id).await?,
        })
    }
}
