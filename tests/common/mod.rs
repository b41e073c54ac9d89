#![allow(dead_code)]

use parcelflow::application::service::CoreService;
use parcelflow::domain::account::Role;
use parcelflow::domain::money::Amount;
use parcelflow::domain::order::NewOrder;
use parcelflow::domain::policy::Actor;
use parcelflow::domain::AccountId;
use parcelflow::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn service() -> CoreService {
    CoreService::new(Arc::new(InMemoryStore::new()))
}

pub async fn actor_with_role(svc: &CoreService, role: Role) -> Actor {
    let account = svc.create_account(role).await.unwrap();
    Actor::new(account.id, role)
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn order_params(owner: AccountId) -> NewOrder {
    NewOrder {
        owner,
        purchase_site: "shop.example".into(),
        purchase_link: "https://shop.example/item/1".into(),
        phone_number: "+4912345".into(),
        notes: None,
        additional_info: None,
    }
}

/// Seeds a funded customer plus a staff account and returns both actors.
pub async fn customer_and_staff(svc: &CoreService, funds: Decimal) -> (Actor, Actor) {
    let staff = actor_with_role(svc, Role::Admin).await;
    let customer = actor_with_role(svc, Role::Customer).await;
    if funds > Decimal::ZERO {
        svc.credit_wallet(&staff, customer.account_id, amount(funds), "topup")
            .await
            .unwrap();
    }
    (customer, staff)
}
