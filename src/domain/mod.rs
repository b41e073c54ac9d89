//! Domain layer: value objects, entities, the order/package state machines,
//! the access policy, and the storage ports.

pub mod account;
pub mod money;
pub mod order;
pub mod package;
pub mod policy;
pub mod ports;
pub mod wallet;

pub type AccountId = u64;
pub type WalletId = u64;
pub type OrderId = u64;
pub type PackageId = u64;
pub type EntryId = u64;

/// Current time as epoch milliseconds. Entities store plain integers so the
/// persistence layer stays serde-trivial.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
