mod common;

use common::{amount, customer_and_staff, order_params, service};
use parcelflow::domain::money::Balance;
use parcelflow::domain::order::OrderStatus;
use parcelflow::error::CoreError;
use rust_decimal_macros::dec;

#[tokio::test]
async fn concurrent_pay_order_debits_exactly_once() {
    let svc = service();
    let (customer, staff) = customer_and_staff(&svc, dec!(150.0)).await;

    let order = svc
        .create_order(&customer, order_params(customer.account_id))
        .await
        .unwrap();
    svc.approve_order(&staff, order.id, amount(dec!(150.0)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let svc = svc.clone();
            let actor = customer;
            let order_id = order.id;
            tokio::spawn(async move { svc.pay_order(&actor, order_id).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                successes += 1;
                assert_eq!(order.status, OrderStatus::Ordering);
            }
            Err(
                CoreError::IllegalTransition { .. }
                | CoreError::ConcurrentModification
                | CoreError::InsufficientFunds,
            ) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);

    // Exactly one debit landed in the ledger.
    let wallet = svc.get_wallet(&customer, customer.account_id).await.unwrap();
    assert_eq!(wallet.balance, Balance::ZERO);
    let debits = wallet
        .entries
        .iter()
        .filter(|e| e.signed_amount() < dec!(0))
        .count();
    assert_eq!(debits, 1);

    let order = svc.get_order(&customer, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Ordering);
}

#[tokio::test]
async fn many_concurrent_pay_attempts_still_single_debit() {
    let svc = service();
    let (customer, staff) = customer_and_staff(&svc, dec!(1000.0)).await;

    let order = svc
        .create_order(&customer, order_params(customer.account_id))
        .await
        .unwrap();
    svc.approve_order(&staff, order.id, amount(dec!(100.0)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            let actor = customer;
            let order_id = order.id;
            tokio::spawn(async move { svc.pay_order(&actor, order_id).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let wallet = svc.get_wallet(&customer, customer.account_id).await.unwrap();
    assert_eq!(wallet.balance, Balance::new(dec!(900.0)));
}

#[tokio::test]
async fn concurrent_lazy_wallet_creation_yields_one_wallet() {
    let svc = service();
    let (customer, _staff) = customer_and_staff(&svc, dec!(0)).await;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            let actor = customer;
            tokio::spawn(async move { svc.get_wallet(&actor, actor.account_id).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // All concurrent readers resolved to the same single wallet.
    let view = svc.get_wallet(&customer, customer.account_id).await.unwrap();
    assert_eq!(view.balance, Balance::ZERO);
}

#[tokio::test]
async fn concurrent_credits_are_all_recorded() {
    let svc = service();
    let (customer, staff) = customer_and_staff(&svc, dec!(0)).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let svc = svc.clone();
            let staff = staff;
            let account_id = customer.account_id;
            tokio::spawn(async move {
                // Credits race on the wallet version; retry like a request
                // handler would.
                for _ in 0..20 {
                    match svc
                        .credit_wallet(&staff, account_id, amount(dec!(10.0)), "topup")
                        .await
                    {
                        Ok(_) => return Ok(()),
                        Err(CoreError::ConcurrentModification) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Err(CoreError::ConcurrentModification)
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let wallet = svc.get_wallet(&customer, customer.account_id).await.unwrap();
    assert_eq!(wallet.balance, Balance::new(dec!(100.0)));
    assert_eq!(wallet.entries.len(), 10);
}
