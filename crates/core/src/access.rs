#![forbid(unsafe_code)]

use crate::principal::Principal;
use crate::role::Role;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Please log in")]
    Unauthenticated,
    #[error("Access denied")]
    Forbidden { role: Role, required: Role },
}

/// Permission gate. Pure decision: attaching the principal is the caller's job.
pub fn authorize(principal: Option<&Principal>, required: Role) -> Result<&Principal, AccessError> {
    let Some(principal) = principal else {
        return Err(AccessError::Unauthenticated);
    };
    if !principal.role.satisfies(required) {
        return Err(AccessError::Forbidden {
            role: principal.role,
            required,
        });
    }
    Ok(principal)
}
