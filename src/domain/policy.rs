use crate::domain::account::Role;
use crate::domain::package::PackageStatus;
use crate::domain::AccountId;
use crate::error::{CoreError, Result};

/// The authenticated caller of a core operation. The excluded HTTP layer is
/// responsible for producing this from its session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    pub account_id: AccountId,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }
}

/// Capability requested against a single resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    ReadOrder,
    CreateOrder,
    PriceOrder,
    ApproveOrder,
    PayOrder,
    CompleteOrder,
    CancelOrder,
    ReadPackage,
    CreatePackage,
    SetCustomsFee,
    PayCustoms,
    AdvancePackage(PackageStatus),
    ReassignShop,
    ReadWallet,
    CreditWallet,
}

/// Single capability check evaluated before any state mutation. Denial is
/// `Forbidden`, which is distinct from a state-machine rejection.
pub fn authorize(
    actor: &Actor,
    resource_owner: AccountId,
    resource_shop: Option<AccountId>,
    op: Operation,
) -> Result<()> {
    // Payments always come out of the resource owner's wallet, so only the
    // owner may trigger them, whatever the role.
    if matches!(op, Operation::PayOrder | Operation::PayCustoms) {
        return if actor.account_id == resource_owner {
            Ok(())
        } else {
            Err(CoreError::Forbidden)
        };
    }

    if actor.role.is_staff() {
        return Ok(());
    }

    let allowed = match actor.role {
        Role::Customer => {
            let own = actor.account_id == resource_owner;
            match op {
                Operation::ReadOrder
                | Operation::CreateOrder
                | Operation::CancelOrder
                | Operation::ReadPackage
                | Operation::ReassignShop
                | Operation::ReadWallet => own,
                // Cancelling a package is an advance into CANCELLED; other
                // moves stay staff/shop business.
                Operation::AdvancePackage(next) => own && next == PackageStatus::Cancelled,
                _ => false,
            }
        }
        Role::Shop => {
            let assigned = resource_shop == Some(actor.account_id);
            match op {
                Operation::ReadPackage => assigned,
                // A shop confirms hand-over to the customer, nothing else.
                Operation::AdvancePackage(next) => assigned && next == PackageStatus::Received,
                _ => false,
            }
        }
        // Staff handled above.
        Role::Admin | Role::Owner => true,
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_own_resources_only() {
        let actor = Actor::new(1, Role::Customer);
        assert!(authorize(&actor, 1, None, Operation::PayOrder).is_ok());
        assert!(matches!(
            authorize(&actor, 2, None, Operation::PayOrder),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn test_customer_cannot_approve() {
        let actor = Actor::new(1, Role::Customer);
        assert!(authorize(&actor, 1, None, Operation::ApproveOrder).is_err());
        assert!(authorize(&actor, 1, None, Operation::SetCustomsFee).is_err());
        assert!(authorize(&actor, 1, None, Operation::CreditWallet).is_err());
    }

    #[test]
    fn test_customer_may_cancel_own_package_only() {
        let actor = Actor::new(1, Role::Customer);
        assert!(authorize(
            &actor,
            1,
            None,
            Operation::AdvancePackage(PackageStatus::Cancelled)
        )
        .is_ok());
        // Forward moves remain staff business.
        assert!(matches!(
            authorize(
                &actor,
                1,
                None,
                Operation::AdvancePackage(PackageStatus::Preparing)
            ),
            Err(CoreError::Forbidden)
        ));
        // Someone else's package stays off limits.
        assert!(matches!(
            authorize(
                &actor,
                2,
                None,
                Operation::AdvancePackage(PackageStatus::Cancelled)
            ),
            Err(CoreError::Forbidden)
        ));
    }

    #[test]
    fn test_payment_is_owner_only_even_for_staff() {
        let staff = Actor::new(9, Role::Admin);
        assert!(matches!(
            authorize(&staff, 1, None, Operation::PayOrder),
            Err(CoreError::Forbidden)
        ));
        assert!(matches!(
            authorize(&staff, 1, None, Operation::PayCustoms),
            Err(CoreError::Forbidden)
        ));
        // Staff paying their own order is still fine.
        assert!(authorize(&staff, 9, None, Operation::PayOrder).is_ok());
    }

    #[test]
    fn test_staff_may_do_anything() {
        for role in [Role::Admin, Role::Owner] {
            let actor = Actor::new(9, role);
            assert!(authorize(&actor, 1, None, Operation::ApproveOrder).is_ok());
            assert!(authorize(&actor, 1, None, Operation::CancelOrder).is_ok());
            assert!(authorize(&actor, 1, None, Operation::CreditWallet).is_ok());
        }
    }

    #[test]
    fn test_shop_limited_to_assigned_receive() {
        let actor = Actor::new(5, Role::Shop);
        assert!(authorize(
            &actor,
            1,
            Some(5),
            Operation::AdvancePackage(PackageStatus::Received)
        )
        .is_ok());
        // Wrong target status.
        assert!(authorize(
            &actor,
            1,
            Some(5),
            Operation::AdvancePackage(PackageStatus::InShop)
        )
        .is_err());
        // Not assigned to this shop.
        assert!(authorize(
            &actor,
            1,
            Some(6),
            Operation::AdvancePackage(PackageStatus::Received)
        )
        .is_err());
        assert!(authorize(&actor, 1, Some(5), Operation::ReadPackage).is_ok());
        assert!(authorize(&actor, 1, Some(5), Operation::PayCustoms).is_err());
    }
}
