use crate::domain::AccountId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Shop,
    Admin,
    Owner,
}

impl Role {
    /// Admin and Owner share the same staff capabilities.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "shop" => Ok(Role::Shop),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub role: Role,
}

impl Account {
    pub fn new(id: AccountId, role: Role) -> Self {
        Self { id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Owner.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(!Role::Shop.is_staff());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("OWNER".parse::<Role>().unwrap(), Role::Owner);
        assert!("clerk".parse::<Role>().is_err());
    }
}
