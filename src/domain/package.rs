use crate::domain::money::Amount;
use crate::domain::{now_millis, AccountId, PackageId};
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    AwaitingPayment,
    Preparing,
    DeliveringToShop,
    InShop,
    Received,
    Cancelled,
    Returned,
}

impl PackageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PackageStatus::Received | PackageStatus::Cancelled | PackageStatus::Returned
        )
    }

    /// Position in the fixed forward ordering; terminal exits have no rank.
    fn rank(&self) -> Option<u8> {
        match self {
            PackageStatus::AwaitingPayment => Some(0),
            PackageStatus::Preparing => Some(1),
            PackageStatus::DeliveringToShop => Some(2),
            PackageStatus::InShop => Some(3),
            PackageStatus::Received => Some(4),
            PackageStatus::Cancelled | PackageStatus::Returned => None,
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageStatus::AwaitingPayment => "AWAITING_PAYMENT",
            PackageStatus::Preparing => "PREPARING",
            PackageStatus::DeliveringToShop => "DELIVERING_TO_SHOP",
            PackageStatus::InShop => "IN_SHOP",
            PackageStatus::Received => "RECEIVED",
            PackageStatus::Cancelled => "CANCELLED",
            PackageStatus::Returned => "RETURNED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PackageStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AWAITING_PAYMENT" => Ok(PackageStatus::AwaitingPayment),
            "PREPARING" => Ok(PackageStatus::Preparing),
            "DELIVERING_TO_SHOP" => Ok(PackageStatus::DeliveringToShop),
            "IN_SHOP" => Ok(PackageStatus::InShop),
            "RECEIVED" => Ok(PackageStatus::Received),
            "CANCELLED" => Ok(PackageStatus::Cancelled),
            "RETURNED" => Ok(PackageStatus::Returned),
            other => Err(format!("unknown package status: {other}")),
        }
    }
}

/// A physical shipment, optionally assigned to a pickup shop, tracked through
/// preparation, customs and delivery.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Package {
    pub id: PackageId,
    pub tracking_number: String,
    pub owner: AccountId,
    pub shop: Option<AccountId>,
    pub description: Option<String>,
    pub customs_fee: Option<Decimal>,
    pub customs_paid: Decimal,
    pub status: PackageStatus,
    pub version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Package {
    pub fn create(
        id: PackageId,
        owner: AccountId,
        shop: Option<AccountId>,
        description: Option<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id,
            tracking_number: format!("TRK-{id:06}"),
            owner,
            shop,
            description,
            customs_fee: None,
            customs_paid: Decimal::ZERO,
            status: PackageStatus::AwaitingPayment,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn customs_outstanding(&self) -> bool {
        self.customs_fee.is_some_and(|fee| fee > self.customs_paid)
    }

    /// Moves exactly one step forward, or exits into CANCELLED/RETURNED from
    /// any non-terminal state. Moving past DELIVERING_TO_SHOP is blocked while
    /// the customs fee is outstanding.
    pub fn advance(&mut self, next: PackageStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::illegal_transition(self.status, next));
        }
        match next.rank() {
            // Terminal exit, always reachable from a non-terminal state.
            None => {}
            Some(next_rank) => {
                let current_rank = self
                    .status
                    .rank()
                    .ok_or_else(|| CoreError::illegal_transition(self.status, next))?;
                if next_rank != current_rank + 1 {
                    return Err(CoreError::illegal_transition(self.status, next));
                }
                // IN_SHOP and beyond require customs to be settled.
                if next_rank > 2 && self.customs_outstanding() {
                    return Err(CoreError::CustomsUnpaid);
                }
            }
        }
        self.status = next;
        self.updated_at = now_millis();
        Ok(())
    }

    /// Staff may (re)price customs while the package is still in flight.
    pub fn set_customs_fee(&mut self, fee: Decimal) -> Result<()> {
        if fee < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "customs fee must be non-negative, got {fee}"
            )));
        }
        if self.status.is_terminal() {
            return Err(CoreError::invalid_state("setting the customs fee", self.status));
        }
        self.customs_fee = Some(fee);
        self.updated_at = now_millis();
        Ok(())
    }

    /// Records a customs payment. The coordinator commits this together with
    /// the owner's wallet debit.
    pub fn record_customs_payment(&mut self, amount: Amount) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::invalid_state("paying customs", self.status));
        }
        self.customs_paid += amount.value();
        self.updated_at = now_millis();
        Ok(())
    }

    pub fn reassign_shop(&mut self, shop: Option<AccountId>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::invalid_state("reassigning the shop", self.status));
        }
        self.shop = shop;
        self.updated_at = now_millis();
        Ok(())
    }
}
