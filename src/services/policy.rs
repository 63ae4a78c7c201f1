//! Authorization policy
//!
//! Every protected operation is checked once, as a predicate over the
//! caller and the operation. Who counts as an administrator is decided by
//! an injected [`AdminPolicy`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::{Principal, Role},
};

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ManageVehicles,
    BookRental,
    ListOwnRentals,
    ChangeRentalStatus,
    /// Submitting a payment reference for a rental owned by `owner_id`
    SubmitPayment { owner_id: i32 },
    ReviewPayment,
    ViewDashboard,
    ViewPaymentQueue,
    EditOwnProfile,
}

impl Operation {
    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Operation::ManageVehicles
                | Operation::ChangeRentalStatus
                | Operation::ReviewPayment
                | Operation::ViewDashboard
                | Operation::ViewPaymentQueue
        )
    }
}

/// Decides whether a principal has administrator privileges
#[cfg_attr(test, mockall::automock)]
pub trait AdminPolicy: Send + Sync {
    fn is_admin(&self, principal: &Principal) -> bool;
}

/// Admins carry the admin role and an allow-listed email.
/// An empty allow-list admits nobody.
#[derive(Debug, Clone, Default)]
pub struct EmailAllowList {
    emails: HashSet<String>,
}

impl EmailAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

impl AdminPolicy for EmailAllowList {
    fn is_admin(&self, principal: &Principal) -> bool {
        principal.role == Role::Admin && self.emails.contains(&principal.email.to_lowercase())
    }
}

pub trait AuthorizationPolicy: Send + Sync {
    fn authorize(&self, principal: &Principal, operation: Operation) -> AppResult<()>;
}

/// Standard policy: admin-only operations go through the admin policy,
/// payment submission requires ownership, the rest needs a principal only.
#[derive(Clone)]
pub struct AccessPolicy {
    admins: Arc<dyn AdminPolicy>,
}

impl AccessPolicy {
    pub fn new(admins: Arc<dyn AdminPolicy>) -> Self {
        Self { admins }
    }
}

impl AuthorizationPolicy for AccessPolicy {
    fn authorize(&self, principal: &Principal, operation: Operation) -> AppResult<()> {
        if operation.requires_admin() {
            return if self.admins.is_admin(principal) {
                Ok(())
            } else {
                Err(AppError::Authorization("Admin access denied".to_string()))
            };
        }

        match operation {
            Operation::SubmitPayment { owner_id } if owner_id != principal.user_id => Err(
                AppError::Authorization("You can only pay for your own rentals".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
