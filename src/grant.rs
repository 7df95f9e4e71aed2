use crate::types::{RoleId, UserId};
use std::collections::BTreeSet;

/// Allowed columns for one table inside a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableColumns {
    /// Qualified (`instance.table`) or bare table name.
    pub table: String,
    /// Column names allowed for that table.
    pub columns: Vec<String>,
}

/// Resource filter of a grant.
///
/// A `None` field leaves that dimension unrestricted. `Some(vec![])` matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Resources {
    /// Data source name or `"*"`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub data_source: Option<String>,
    /// Instance globs.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub instances: Option<Vec<String>>,
    /// Table globs, matched against bare and qualified names.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub tables: Option<Vec<String>>,
    /// Columns allowed on any table.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub columns_allow: Option<Vec<String>>,
    /// Columns allowed on specific tables.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub columns_by_table: Option<Vec<TableColumns>>,
}

/// A set of actions bound to a resource filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grant {
    /// Canonical action names or `"*"`.
    pub actions: Vec<String>,
    /// Resource filter.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resources: Resources,
}

impl Grant {
    /// Creates an unrestricted grant for the given actions.
    pub fn new<I, A>(actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: Resources::default(),
        }
    }

    /// Restricts the grant to one data source (or `"*"`).
    pub fn data_source(mut self, data_source: impl Into<String>) -> Self {
        self.resources.data_source = Some(data_source.into());
        self
    }

    /// Restricts the grant to instances matching any of the globs.
    pub fn instances<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.resources.instances = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the grant to tables matching any of the globs.
    pub fn tables<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.resources.tables = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts requested columns on every table.
    pub fn columns_allow<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.resources.columns_allow = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts requested columns on one table.
    pub fn columns_for_table<I, C>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.resources
            .columns_by_table
            .get_or_insert_with(Vec::new)
            .push(TableColumns {
                table: table.into(),
                columns: columns.into_iter().map(Into::into).collect(),
            });
        self
    }
}

/// Named collection of grants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Role {
    /// Role identifier.
    pub id: RoleId,
    /// Grants in declaration order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub grants: Vec<Grant>,
}

impl Role {
    /// Creates a role without grants.
    pub fn new(id: RoleId) -> Self {
        Self {
            id,
            grants: Vec::new(),
        }
    }

    /// Appends a grant.
    pub fn with_grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }
}

/// User record with assigned roles.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// User identifier (lower-cased).
    pub id: UserId,
    /// Assigned role ids.
    #[cfg_attr(feature = "serde", serde(default))]
    pub roles: BTreeSet<RoleId>,
}

impl User {
    /// Creates a user without roles.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: BTreeSet::new(),
        }
    }

    /// Assigns a role.
    pub fn with_role(mut self, role: RoleId) -> Self {
        self.roles.insert(role);
        self
    }
}

/// A user together with the roles that resolved from one store view.
///
/// Roles the store did not know are absent; they contribute no grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User record.
    pub user: User,
    /// Resolved roles.
    pub roles: Vec<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_should_distinguish_absent_from_empty() {
        let open = Grant::new(["SELECT"]);
        assert!(open.resources.tables.is_none());

        let closed = Grant::new(["SELECT"]).tables(Vec::<String>::new());
        assert_eq!(closed.resources.tables, Some(Vec::new()));
    }

    #[test]
    fn columns_for_table_should_accumulate_entries() {
        let grant = Grant::new(["*"])
            .columns_for_table("inst-a.orders", ["id"])
            .columns_for_table("customers", ["id", "name"]);
        let entries = grant.resources.columns_by_table.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].table, "customers");
    }
}
