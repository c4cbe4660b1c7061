#![forbid(unsafe_code)]

use crate::records::{Collection, RecordStore, Table};
use crate::StoreError;
use qc_core::{Principal, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stored user account. Passwords are kept and compared in plaintext, exactly
/// as the existing `users.json` files hold them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl UserRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            role: self.role,
            customer_id: self.customer_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub customer_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
}

pub struct UserDirectory {
    table: Table<UserRecord>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            table: Table::new(store, Collection::Users),
        }
    }

    /// Writes the default accounts when the collection is empty. Returns the
    /// number of accounts created.
    pub fn seed_defaults(&self) -> Result<usize, StoreError> {
        self.table.update(|users| {
            if !users.is_empty() {
                tracing::info!(count = users.len(), "users collection present");
                return Ok(0);
            }
            users.extend(default_users());
            tracing::info!(count = users.len(), "seeded default users");
            Ok(users.len())
        })
    }

    pub fn authenticate(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .table
            .read()?
            .into_iter()
            .find(|user| user.user_id == user_id && user.password == password))
    }

    pub fn principal(&self, user_id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .table
            .read()?
            .iter()
            .find(|user| user.user_id == user_id)
            .map(UserRecord::principal))
    }

    pub fn customers(&self) -> Result<Vec<CustomerSummary>, StoreError> {
        Ok(self
            .table
            .read()?
            .into_iter()
            .filter(|user| user.role == Role::Customer)
            .map(|user| CustomerSummary {
                customer_id: user.customer_id,
                name: user.name,
                email: user.email,
            })
            .collect())
    }
}

fn account(
    user_id: &str,
    password: &str,
    name: &str,
    role: Role,
    email: &str,
    department: Option<&str>,
    customer_id: Option<&str>,
) -> UserRecord {
    UserRecord {
        user_id: user_id.to_string(),
        password: password.to_string(),
        name: name.to_string(),
        role,
        email: Some(email.to_string()),
        department: department.map(str::to_string),
        customer_id: customer_id.map(str::to_string),
    }
}

pub fn default_users() -> Vec<UserRecord> {
    vec![
        account(
            "admin",
            "admin123",
            "Senior Engineer",
            Role::Admin,
            "admin@company.com",
            Some("Management"),
            None,
        ),
        account(
            "quality",
            "qc123",
            "Priya Sharma",
            Role::Quality,
            "priya@company.com",
            Some("Quality Control"),
            None,
        ),
        account(
            "production",
            "prod123",
            "Amit Singh",
            Role::Production,
            "amit@company.com",
            Some("Production"),
            None,
        ),
        account(
            "customer1",
            "cust123",
            "UPPTCL",
            Role::Customer,
            "upptcl@customer.com",
            None,
            Some("CUST001"),
        ),
    ]
}
