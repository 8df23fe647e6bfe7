//! Authenticated identities.
//!
//! [`AdminPrincipal`] has a private field, so it can only be produced by
//! [`AuthService::authenticate`](crate::AuthService::authenticate) after
//! the account has been loaded and confirmed as an admin. Operations
//! that take `&AdminPrincipal` are therefore unreachable with a
//! resident identity.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    id: Uuid,
}

impl AdminPrincipal {
    pub(crate) fn new(id: Uuid) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Resident(Uuid),
    Admin(AdminPrincipal),
}

impl Principal {
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::Resident(id) => *id,
            Self::Admin(admin) => admin.id(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    pub fn as_admin(&self) -> Option<&AdminPrincipal> {
        match self {
            Self::Admin(admin) => Some(admin),
            Self::Resident(_) => None,
        }
    }
}
