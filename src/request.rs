//! Authorization request input.
//!
//! Fields are optional because incomplete requests are valid input: they
//! evaluate to [`Decision::Indeterminate`](crate::Decision::Indeterminate)
//! rather than failing to parse.

/// Outer request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RequestInfo {
    /// HTTP or SQL verb.
    pub method: Option<String>,
    /// Columns the caller wants to touch. Column checks read this list.
    pub columns: Option<Vec<String>>,
}

/// Target of the data query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueryInfo {
    /// Declared query type, expected to agree with the verb.
    pub query_type: Option<String>,
    /// Data source name (`aurora`, `snowflake`, `s3`, `dynamodb`).
    pub data_source: Option<String>,
    /// Instance, database or bucket name.
    pub instance: Option<String>,
    /// Table, prefix or key-space name.
    pub table: Option<String>,
    /// Columns named by the query body. Informational only.
    pub columns: Option<Vec<String>>,
    /// Query text for SQL and object-store sources.
    pub query_sql: Option<String>,
    /// Key condition for key-value sources.
    #[cfg_attr(feature = "serde", serde(rename = "KeyConditionExpression"))]
    pub key_condition_expression: Option<String>,
}

/// Full authorization input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AuthzInput {
    /// Caller identity.
    pub user_id: Option<String>,
    /// Request metadata.
    pub request: RequestInfo,
    /// Query target.
    pub query: QueryInfo,
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

impl AuthzInput {
    /// Creates an input with the three required fields set.
    pub fn new(
        user_id: impl Into<String>,
        method: impl Into<String>,
        query_type: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            request: RequestInfo {
                method: Some(method.into()),
                columns: None,
            },
            query: QueryInfo {
                query_type: Some(query_type.into()),
                ..QueryInfo::default()
            },
        }
    }

    /// Sets `query.data_source`.
    pub fn data_source(mut self, value: impl Into<String>) -> Self {
        self.query.data_source = Some(value.into());
        self
    }

    /// Sets `query.instance`.
    pub fn instance(mut self, value: impl Into<String>) -> Self {
        self.query.instance = Some(value.into());
        self
    }

    /// Sets `query.table`.
    pub fn table(mut self, value: impl Into<String>) -> Self {
        self.query.table = Some(value.into());
        self
    }

    /// Sets `request.columns`.
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.request.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets `query.query_sql`.
    pub fn query_sql(mut self, value: impl Into<String>) -> Self {
        self.query.query_sql = Some(value.into());
        self
    }

    /// Sets `query.KeyConditionExpression`.
    pub fn key_condition(mut self, value: impl Into<String>) -> Self {
        self.query.key_condition_expression = Some(value.into());
        self
    }

    /// Requested columns, or `None` when the request names none.
    pub(crate) fn requested_columns(&self) -> Option<&[String]> {
        self.request
            .columns
            .as_deref()
            .filter(|columns| !columns.is_empty())
    }

    pub(crate) fn instance_name(&self) -> Option<&str> {
        present(&self.query.instance)
    }

    pub(crate) fn table_name(&self) -> Option<&str> {
        present(&self.query.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_should_count_as_missing() {
        let input = AuthzInput::new("alice", "GET", "SELECT").instance("").table("orders");
        assert_eq!(input.instance_name(), None);
        assert_eq!(input.table_name(), Some("orders"));
    }

    #[test]
    fn empty_column_list_should_count_as_no_columns() {
        let input = AuthzInput::new("alice", "GET", "SELECT").columns(Vec::<String>::new());
        assert!(input.requested_columns().is_none());
    }

    #[test]
    fn query_columns_should_not_be_requested_columns() {
        let mut input = AuthzInput::new("alice", "GET", "SELECT");
        input.query.columns = Some(vec!["ssn".to_string()]);
        assert!(input.requested_columns().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_should_use_wire_names() {
        let input: AuthzInput = serde_json::from_value(serde_json::json!({
            "user_id": "alice",
            "request": { "method": "GET", "columns": ["id"] },
            "query": {
                "query_type": "SELECT",
                "data_source": "dynamodb",
                "table": "orders",
                "KeyConditionExpression": "pk = :id"
            }
        }))
        .unwrap();
        assert_eq!(input.query.key_condition_expression.as_deref(), Some("pk = :id"));
        assert_eq!(input.requested_columns().map(<[String]>::len), Some(1));
    }
}
