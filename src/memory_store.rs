use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::grant::{Grant, Principal, Role, User};
use crate::store::{RoleStore, Store, UserStore};
use crate::types::{RoleId, UserId};

/// Immutable user and role database.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Database {
    users: HashMap<UserId, User>,
    roles: HashMap<RoleId, Role>,
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Inserts or replaces a role.
    pub fn insert_role(&mut self, role: Role) {
        self.roles.insert(role.id.clone(), role);
    }

    /// Looks up a user.
    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// Looks up a role.
    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(id)
    }

    /// Resolves a user and their known roles.
    pub fn principal(&self, id: &UserId) -> Option<Principal> {
        let user = self.users.get(id)?;
        let roles = user
            .roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .cloned()
            .collect();
        Some(Principal {
            user: user.clone(),
            roles,
        })
    }
}

#[cfg(feature = "serde")]
mod document {
    use super::Database;
    use crate::error::{Error, Result};
    use crate::grant::{Grant, Role, User};
    use crate::types::{RoleId, UserId};
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Deserialize)]
    struct UserEntry {
        #[serde(default)]
        roles: Vec<String>,
    }

    #[derive(Deserialize)]
    struct RoleEntry {
        #[serde(default)]
        grants: Vec<Value>,
    }

    fn section<'a>(
        document: &'a serde_json::Map<String, Value>,
        name: &str,
    ) -> Result<Option<&'a serde_json::Map<String, Value>>> {
        match document.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(Error::InvalidDocument(format!("`{name}` must be an object"))),
        }
    }

    impl Database {
        /// Builds a database from a JSON document shaped like
        /// `{"users": {id: {"roles": [..]}}, "roles": {id: {"grants": [..]}}}`.
        ///
        /// Malformed users, roles, role references and grants are skipped with
        /// a warning. Only a document whose top-level shape is wrong is an
        /// error.
        pub fn from_json(document: &Value) -> Result<Self> {
            let document = document.as_object().ok_or_else(|| {
                Error::InvalidDocument("database document must be an object".to_string())
            })?;
            let mut db = Database::new();

            for (key, value) in section(document, "roles")?.into_iter().flatten() {
                let Ok(id) = RoleId::new(key) else {
                    tracing::warn!(role = %key, "skipping role with invalid id");
                    continue;
                };
                let entry = match RoleEntry::deserialize(value) {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!(role = %id, error = %err, "skipping malformed role");
                        continue;
                    }
                };
                let mut role = Role::new(id);
                for (index, grant) in entry.grants.iter().enumerate() {
                    match Grant::deserialize(grant) {
                        Ok(grant) => role.grants.push(grant),
                        Err(err) => tracing::warn!(
                            role = %role.id,
                            index,
                            error = %err,
                            "skipping malformed grant"
                        ),
                    }
                }
                db.insert_role(role);
            }

            for (key, value) in section(document, "users")?.into_iter().flatten() {
                let Ok(id) = UserId::new(key) else {
                    tracing::warn!(user = %key, "skipping user with invalid id");
                    continue;
                };
                let entry = match UserEntry::deserialize(value) {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!(user = %id, error = %err, "skipping malformed user");
                        continue;
                    }
                };
                let mut user = User::new(id);
                for role in &entry.roles {
                    match RoleId::new(role) {
                        Ok(role) => {
                            user.roles.insert(role);
                        }
                        Err(err) => {
                            tracing::warn!(user = %user.id, error = %err, "skipping role reference")
                        }
                    }
                }
                db.insert_user(user);
            }

            Ok(db)
        }
    }
}

/// In-memory store that serves decisions from atomically swapped snapshots.
///
/// Mutations copy the current database and publish the copy, so a decision
/// that already holds a snapshot never observes a partial update.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Arc<Database>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store serving the given database.
    pub fn from_database(db: Database) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(db))),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Database> {
        self.inner.read().expect("poisoned lock").clone()
    }

    /// Replaces the whole database in one step.
    pub fn replace(&self, db: Database) {
        let mut guard = self.inner.write().expect("poisoned lock");
        *guard = Arc::new(db);
    }

    fn update(&self, apply: impl FnOnce(&mut Database)) {
        let mut guard = self.inner.write().expect("poisoned lock");
        apply(Arc::make_mut(&mut guard));
    }

    /// Adds a user without roles if missing.
    pub fn add_user(&self, user: UserId) {
        self.update(|db| {
            db.users
                .entry(user.clone())
                .or_insert_with(|| User::new(user));
        });
    }

    /// Assigns a role to a user, creating the user if missing.
    pub fn add_user_role(&self, user: UserId, role: RoleId) {
        self.update(|db| {
            db.users
                .entry(user.clone())
                .or_insert_with(|| User::new(user))
                .roles
                .insert(role);
        });
    }

    /// Inserts or replaces a role.
    pub fn add_role(&self, role: Role) {
        self.update(|db| db.insert_role(role));
    }

    /// Appends a grant to a role, creating the role if missing.
    pub fn add_grant(&self, role: RoleId, grant: Grant) {
        self.update(|db| {
            db.roles
                .entry(role.clone())
                .or_insert_with(|| Role::new(role))
                .grants
                .push(grant);
        });
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: &UserId) -> std::result::Result<Option<User>, crate::StoreError> {
        Ok(self.snapshot().user(id).cloned())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn role(&self, id: &RoleId) -> std::result::Result<Option<Role>, crate::StoreError> {
        Ok(self.snapshot().role(id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn principal(
        &self,
        id: &UserId,
    ) -> std::result::Result<Option<Principal>, crate::StoreError> {
        Ok(self.snapshot().principal(id))
    }
}
