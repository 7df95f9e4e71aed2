use crate::types::{eq_folded, fold};
use std::fmt;

/// Wildcard entry in a grant's action list.
pub const ANY_ACTION: &str = "*";

/// Canonical data action derived from a request verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Action {
    /// Read rows (`GET`, `SELECT`).
    Select,
    /// Create rows (`POST`, `INSERT`).
    Insert,
    /// Modify rows (`PUT`, `PATCH`, `UPDATE`).
    Update,
    /// Remove rows (`DELETE`, `DEL`).
    Delete,
}

impl Action {
    /// Maps an HTTP or SQL verb to its canonical action, ignoring case.
    ///
    /// Returns `None` for unsupported verbs.
    pub fn from_method(method: &str) -> Option<Self> {
        match fold(method.trim()).as_ref() {
            "get" | "select" => Some(Self::Select),
            "post" | "insert" => Some(Self::Insert),
            "put" | "patch" | "update" => Some(Self::Update),
            "delete" | "del" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Checks the query's declared type against this action.
    pub fn matches_query_type(self, query_type: &str) -> bool {
        eq_folded(self.as_str(), query_type.trim())
    }

    /// Returns true if an action-list entry permits this action.
    pub(crate) fn permitted_by(self, entry: &str) -> bool {
        let entry = entry.trim();
        entry == ANY_ACTION || eq_folded(self.as_str(), entry)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_method_should_map_http_and_sql_verbs() {
        assert_eq!(Action::from_method("GET"), Some(Action::Select));
        assert_eq!(Action::from_method("select"), Some(Action::Select));
        assert_eq!(Action::from_method("Post"), Some(Action::Insert));
        assert_eq!(Action::from_method("INSERT"), Some(Action::Insert));
        assert_eq!(Action::from_method("put"), Some(Action::Update));
        assert_eq!(Action::from_method("PATCH"), Some(Action::Update));
        assert_eq!(Action::from_method("update"), Some(Action::Update));
        assert_eq!(Action::from_method("DELETE"), Some(Action::Delete));
        assert_eq!(Action::from_method("del"), Some(Action::Delete));
    }

    #[test]
    fn from_method_should_reject_unknown_verbs() {
        assert_eq!(Action::from_method("HEAD"), None);
        assert_eq!(Action::from_method(""), None);
        assert_eq!(Action::from_method("options"), None);
    }

    #[test]
    fn query_type_should_compare_ignoring_case() {
        assert!(Action::Select.matches_query_type("select"));
        assert!(!Action::Insert.matches_query_type("SELECT"));
    }

    #[test]
    fn wildcard_entry_should_permit_every_action() {
        for action in [Action::Select, Action::Insert, Action::Update, Action::Delete] {
            assert!(action.permitted_by(ANY_ACTION));
        }
        assert!(Action::Delete.permitted_by("delete"));
        assert!(!Action::Delete.permitted_by("SELECT"));
    }
}
