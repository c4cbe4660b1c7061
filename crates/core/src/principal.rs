#![forbid(unsafe_code)]

use crate::role::Role;

/// The authenticated actor behind a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub customer_id: Option<String>,
}

impl Principal {
    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    /// Whether a record owned by `customer_id` is visible to this principal.
    /// Non-customer roles see everything; a customer only sees records tagged
    /// with its own customer id.
    pub fn can_see(&self, customer_id: Option<&str>) -> bool {
        if !self.is_customer() {
            return true;
        }
        match (self.customer_id.as_deref(), customer_id) {
            (Some(own), Some(owner)) => own == owner,
            // Untagged records stay hidden from a customer account that has no
            // customer id of its own, even though both sides are absent.
            _ => false,
        }
    }
}

/// Applies customer scoping for an optional principal; anonymous callers are
/// not scoped.
pub fn visible_to(principal: Option<&Principal>, customer_id: Option<&str>) -> bool {
    principal.is_none_or(|principal| principal.can_see(customer_id))
}
