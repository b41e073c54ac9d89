use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use parcelflow::application::service::CoreService;
use parcelflow::domain::account::Role;
use parcelflow::domain::money::Amount;
use parcelflow::domain::order::NewOrder;
use parcelflow::domain::package::PackageStatus;
use parcelflow::domain::policy::Actor;
use parcelflow::domain::ports::DatastoreRef;
use parcelflow::error::CoreError;
use parcelflow::infrastructure::in_memory::InMemoryStore;
use parcelflow::interfaces::csv::operation_reader::{OpKind, OperationReader, OperationRecord};
use parcelflow::interfaces::csv::summary_writer::SummaryWriter;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Replays an operations CSV (`op, actor, target, amount, arg`) against the
/// core and prints the resulting wallet balances and order/package statuses.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Driver {
    service: CoreService,
    store: DatastoreRef,
    roles: HashMap<u64, Role>,
    orders: BTreeMap<u64, u64>,
    packages: BTreeMap<u64, u64>,
}

impl Driver {
    fn new(store: DatastoreRef) -> Self {
        Self {
            service: CoreService::new(store.clone()),
            store,
            roles: HashMap::new(),
            orders: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }

    fn actor(&self, id: u64) -> Result<Actor, CoreError> {
        let role = self
            .roles
            .get(&id)
            .copied()
            .ok_or(CoreError::NotFound("account"))?;
        Ok(Actor::new(id, role))
    }

    fn target(record: &OperationRecord) -> Result<u64, CoreError> {
        record
            .target
            .ok_or_else(|| CoreError::Internal("missing target column".into()))
    }

    fn amount(record: &OperationRecord) -> Result<Amount, CoreError> {
        let value = record
            .amount
            .ok_or_else(|| CoreError::InvalidAmount("missing amount column".into()))?;
        Amount::new(value)
    }

    fn order_id(&self, handle: u64) -> Result<u64, CoreError> {
        self.orders
            .get(&handle)
            .copied()
            .ok_or(CoreError::NotFound("order"))
    }

    fn package_id(&self, handle: u64) -> Result<u64, CoreError> {
        self.packages
            .get(&handle)
            .copied()
            .ok_or(CoreError::NotFound("package"))
    }

    async fn apply(&mut self, record: OperationRecord) -> Result<(), CoreError> {
        match record.op {
            OpKind::Account => {
                let role: Role = record
                    .arg
                    .as_deref()
                    .unwrap_or("customer")
                    .parse()
                    .map_err(CoreError::Internal)?;
                self.service.register_account(record.actor, role).await?;
                self.roles.insert(record.actor, role);
            }
            OpKind::Credit => {
                let actor = self.actor(record.actor)?;
                let account_id = Self::target(&record)?;
                let reason = record.arg.as_deref().unwrap_or("topup");
                self.service
                    .credit_wallet(&actor, account_id, Self::amount(&record)?, reason)
                    .await?;
            }
            OpKind::Order => {
                let actor = self.actor(record.actor)?;
                let handle = Self::target(&record)?;
                let order = self
                    .service
                    .create_order(
                        &actor,
                        NewOrder {
                            owner: record.actor,
                            purchase_site: record.arg.clone().unwrap_or_default(),
                            purchase_link: String::new(),
                            phone_number: String::new(),
                            notes: None,
                            additional_info: None,
                        },
                    )
                    .await?;
                self.orders.insert(handle, order.id);
            }
            OpKind::Price => {
                let actor = self.actor(record.actor)?;
                let id = self.order_id(Self::target(&record)?)?;
                self.service
                    .set_order_price(&actor, id, Self::amount(&record)?)
                    .await?;
            }
            OpKind::Approve => {
                let actor = self.actor(record.actor)?;
                let id = self.order_id(Self::target(&record)?)?;
                self.service
                    .approve_order(&actor, id, Self::amount(&record)?)
                    .await?;
            }
            OpKind::Pay => {
                let actor = self.actor(record.actor)?;
                let id = self.order_id(Self::target(&record)?)?;
                self.service.pay_order(&actor, id).await?;
            }
            OpKind::Complete => {
                let actor = self.actor(record.actor)?;
                let id = self.order_id(Self::target(&record)?)?;
                self.service.complete_order(&actor, id).await?;
            }
            OpKind::Cancel => {
                let actor = self.actor(record.actor)?;
                let id = self.order_id(Self::target(&record)?)?;
                self.service.cancel_order(&actor, id).await?;
            }
            OpKind::Package => {
                let actor = self.actor(record.actor)?;
                let handle = Self::target(&record)?;
                let owner: u64 = record
                    .arg
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|_| CoreError::Internal("package owner must be an id".into()))?;
                let package = self
                    .service
                    .create_package(&actor, owner, None, None)
                    .await?;
                self.packages.insert(handle, package.id);
            }
            OpKind::CustomsFee => {
                let actor = self.actor(record.actor)?;
                let id = self.package_id(Self::target(&record)?)?;
                let fee = record
                    .amount
                    .ok_or_else(|| CoreError::InvalidAmount("missing amount column".into()))?;
                self.service.set_customs_fee(&actor, id, fee).await?;
            }
            OpKind::PayCustoms => {
                let actor = self.actor(record.actor)?;
                let id = self.package_id(Self::target(&record)?)?;
                self.service
                    .pay_customs(&actor, id, Self::amount(&record)?)
                    .await?;
            }
            OpKind::Advance => {
                let actor = self.actor(record.actor)?;
                let id = self.package_id(Self::target(&record)?)?;
                let next: PackageStatus = record
                    .arg
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(CoreError::Internal)?;
                self.service.advance_package(&actor, id, next).await?;
            }
            OpKind::Wallet => {
                let actor = self.actor(record.actor)?;
                let account_id = Self::target(&record)?;
                self.service.get_wallet(&actor, account_id).await?;
            }
        }
        Ok(())
    }

    async fn write_summary<W: io::Write>(&self, writer: &mut SummaryWriter<W>) -> Result<(), CoreError> {
        writer.write_header()?;
        for wallet in self.store.all_wallets().await? {
            // Fixed two-decimal rendering; Decimal's own scale varies with
            // the arithmetic that produced the value.
            let balance = format!("{:.2}", wallet.balance.value());
            writer.write_row("wallet", wallet.account_id, &balance)?;
        }
        for (handle, id) in &self.orders {
            if let Some(order) = self.store.order(*id).await? {
                writer.write_row("order", *handle, &order.status.to_string())?;
            }
        }
        for (handle, id) in &self.packages {
            if let Some(package) = self.store.package(*id).await? {
                writer.write_row("package", *handle, &package.status.to_string())?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<DatastoreRef> {
    match db_path {
        None => Ok(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store =
                parcelflow::infrastructure::rocksdb::RocksDbStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette!(
            "persistent storage requires the storage-rocksdb feature"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.db_path)?;
    let mut driver = Driver::new(store);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for record in reader.operations() {
        match record {
            Ok(record) => {
                if let Err(e) = driver.apply(record).await {
                    eprintln!("Error processing operation: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {e}");
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = SummaryWriter::new(stdout.lock());
    driver.write_summary(&mut writer).await.into_diagnostic()?;

    Ok(())
}
