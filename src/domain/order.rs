use crate::domain::money::Amount;
use crate::domain::{now_millis, AccountId, OrderId};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingApproval,
    AwaitingPayment,
    Ordering,
    OrderCompleted,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::OrderCompleted | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::PendingApproval => "PENDING_APPROVAL",
            OrderStatus::AwaitingPayment => "AWAITING_PAYMENT",
            OrderStatus::Ordering => "ORDERING",
            OrderStatus::OrderCompleted => "ORDER_COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// A customer's purchase request, tracked through approval, payment and
/// fulfilment. Status only moves through the methods below; each validates
/// against the current snapshot and fails without partial effect.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub owner: AccountId,
    pub purchase_site: String,
    pub purchase_link: String,
    pub phone_number: String,
    pub notes: Option<String>,
    pub additional_info: Option<String>,
    pub total_amount: Option<Amount>,
    pub status: OrderStatus,
    pub version: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

pub struct NewOrder {
    pub owner: AccountId,
    pub purchase_site: String,
    pub purchase_link: String,
    pub phone_number: String,
    pub notes: Option<String>,
    pub additional_info: Option<String>,
}

impl Order {
    pub fn create(id: OrderId, params: NewOrder) -> Self {
        let now = now_millis();
        Self {
            id,
            order_number: format!("PF-{id:05}"),
            owner: params.owner,
            purchase_site: params.purchase_site,
            purchase_link: params.purchase_link,
            phone_number: params.phone_number,
            notes: params.notes,
            additional_info: params.additional_info,
            total_amount: None,
            status: OrderStatus::PendingApproval,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus) -> Result<()> {
        if self.status != from {
            return Err(CoreError::illegal_transition(self.status, to));
        }
        self.status = to;
        self.updated_at = now_millis();
        Ok(())
    }

    /// Staff set the price before payment. Allowed while the order has not
    /// been paid yet.
    pub fn set_price(&mut self, total: Amount) -> Result<()> {
        match self.status {
            OrderStatus::PendingApproval | OrderStatus::AwaitingPayment => {
                self.total_amount = Some(total);
                self.updated_at = now_millis();
                Ok(())
            }
            other => Err(CoreError::invalid_state("setting the price", other)),
        }
    }

    /// An order cannot enter AWAITING_PAYMENT without a price, so approval
    /// carries the price with it.
    pub fn approve(&mut self, total: Amount) -> Result<()> {
        self.transition(OrderStatus::PendingApproval, OrderStatus::AwaitingPayment)?;
        self.total_amount = Some(total);
        Ok(())
    }

    /// Only the transaction coordinator calls this, together with the wallet
    /// debit, inside one commit.
    pub fn mark_paid(&mut self) -> Result<()> {
        self.transition(OrderStatus::AwaitingPayment, OrderStatus::Ordering)
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(OrderStatus::Ordering, OrderStatus::OrderCompleted)
    }

    /// Cancels from any non-completed state. Returns the refund due when the
    /// order had already been paid.
    pub fn cancel(&mut self) -> Result<Option<Amount>> {
        let refund = match self.status {
            OrderStatus::OrderCompleted | OrderStatus::Cancelled => {
                return Err(CoreError::illegal_transition(
                    self.status,
                    OrderStatus::Cancelled,
                ));
            }
            OrderStatus::Ordering => self.total_amount,
            _ => None,
        };
        self.status = OrderStatus::Cancelled;
        self.updated_at = now_millis();
        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::create(
            1,
            NewOrder {
                owner: 1,
                purchase_site: "shop.example".into(),
                purchase_link: "https://shop.example/item/42".into(),
                phone_number: "+123456".into(),
                notes: None,
                additional_info: None,
            },
        )
    }

    fn price(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn test_happy_path() {
        let mut order = order();
        assert_eq!(order.status, OrderStatus::PendingApproval);

        order.approve(price(dec!(150.0))).unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.total_amount, Some(price(dec!(150.0))));

        order.mark_paid().unwrap();
        assert_eq!(order.status, OrderStatus::Ordering);

        order.complete().unwrap();
        assert_eq!(order.status, OrderStatus::OrderCompleted);
    }

    #[test]
    fn test_pay_before_approval_rejected() {
        let mut order = order();
        let result = order.mark_paid();
        assert!(matches!(result, Err(CoreError::IllegalTransition { .. })));
        assert_eq!(order.status, OrderStatus::PendingApproval);
    }

    #[test]
    fn test_double_pay_rejected() {
        let mut order = order();
        order.approve(price(dec!(10.0))).unwrap();
        order.mark_paid().unwrap();
        assert!(matches!(
            order.mark_paid(),
            Err(CoreError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_unpaid_has_no_refund() {
        let mut order = order();
        order.approve(price(dec!(10.0))).unwrap();
        let refund = order.cancel().unwrap();
        assert_eq!(refund, None);
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_cancel_paid_returns_refund() {
        let mut order = order();
        order.approve(price(dec!(75.0))).unwrap();
        order.mark_paid().unwrap();
        let refund = order.cancel().unwrap();
        assert_eq!(refund, Some(price(dec!(75.0))));
    }

    #[test]
    fn test_cancel_completed_rejected() {
        let mut order = order();
        order.approve(price(dec!(10.0))).unwrap();
        order.mark_paid().unwrap();
        order.complete().unwrap();
        assert!(matches!(
            order.cancel(),
            Err(CoreError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_set_price_after_payment_rejected() {
        let mut order = order();
        order.approve(price(dec!(10.0))).unwrap();
        order.mark_paid().unwrap();
        assert!(matches!(
            order.set_price(price(dec!(20.0))),
            Err(CoreError::InvalidState { .. })
        ));
    }
}
