use crate::error::StoreError;
use crate::grant::{Principal, Role, User};
use crate::types::{RoleId, UserId};
use async_trait::async_trait;

/// Store interface for users.
#[async_trait]
pub trait UserStore {
    /// Returns the user with the given (lower-cased) id, if any.
    async fn user(&self, id: &UserId) -> std::result::Result<Option<User>, StoreError>;
}

/// Store interface for roles.
#[async_trait]
pub trait RoleStore {
    /// Returns the role with the given id, if any.
    async fn role(&self, id: &RoleId) -> std::result::Result<Option<Role>, StoreError>;
}

/// Composite store trait.
#[async_trait]
pub trait Store: UserStore + RoleStore + Send + Sync {
    /// Resolves a user and the roles they reference.
    ///
    /// Stores that can swap their contents should override this so the user
    /// and every role come from the same snapshot. Roles the store does not
    /// know are skipped.
    async fn principal(&self, id: &UserId) -> std::result::Result<Option<Principal>, StoreError> {
        let Some(user) = self.user(id).await? else {
            return Ok(None);
        };
        let mut roles = Vec::with_capacity(user.roles.len());
        for role_id in &user.roles {
            match self.role(role_id).await? {
                Some(role) => roles.push(role),
                None => tracing::debug!(user = %id, role = %role_id, "skipping unknown role"),
            }
        }
        Ok(Some(Principal { user, roles }))
    }
}
