use crate::cache::Matcher;
use crate::grant::Grant;
use crate::request::{AuthzInput, present};
use crate::types::{eq_folded, fold};

const ANY_SOURCE: &str = "*";
const ANY_INSTANCE: &str = "*";

/// Data source family, which decides the required query fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Relational engines (`aurora`, `snowflake`).
    Sql,
    /// Object storage (`s3`).
    S3,
    /// Key-value store (`dynamodb`).
    DynamoDb,
    /// Anything else.
    Unknown,
}

impl SourceKind {
    /// Classifies a data source name, ignoring case.
    pub fn classify(name: &str) -> Self {
        match fold(name.trim()).as_ref() {
            "aurora" | "snowflake" => Self::Sql,
            "s3" => Self::S3,
            "dynamodb" => Self::DynamoDb,
            _ => Self::Unknown,
        }
    }

    /// Name of the query field this source requires, if any.
    pub fn required_field(self) -> Option<&'static str> {
        match self {
            Self::Sql | Self::S3 => Some("query_sql"),
            Self::DynamoDb => Some("KeyConditionExpression"),
            Self::Unknown => None,
        }
    }
}

/// Why per-source field validation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryFieldsError {
    MissingDataSource,
    UnknownSource(String),
    MissingField {
        field: &'static str,
        data_source: String,
    },
}

/// Validates the source-specific fields a query must carry.
pub(crate) fn check_query_fields(input: &AuthzInput) -> Result<(), QueryFieldsError> {
    let Some(data_source) = present(&input.query.data_source) else {
        return Err(QueryFieldsError::MissingDataSource);
    };
    let kind = SourceKind::classify(data_source);
    let supplied = match kind {
        SourceKind::Sql | SourceKind::S3 => present(&input.query.query_sql),
        SourceKind::DynamoDb => present(&input.query.key_condition_expression),
        SourceKind::Unknown => {
            return Err(QueryFieldsError::UnknownSource(data_source.to_string()));
        }
    };
    match (supplied, kind.required_field()) {
        (None, Some(field)) => Err(QueryFieldsError::MissingField {
            field,
            data_source: data_source.to_string(),
        }),
        _ => Ok(()),
    }
}

/// `<instance>.<table>` when an instance is given, else the bare table.
/// Always lower-cased.
pub fn qualified_table(input: &AuthzInput) -> String {
    let table = fold(input.table_name().unwrap_or_default());
    match input.instance_name() {
        Some(instance) => format!("{}.{}", fold(instance), table),
        None => table.into_owned(),
    }
}

pub(crate) fn data_source_ok(grant: &Grant, input: &AuthzInput) -> bool {
    match grant.resources.data_source.as_deref() {
        None => true,
        Some(ANY_SOURCE) => true,
        Some(allowed) => input
            .query
            .data_source
            .as_deref()
            .is_some_and(|requested| eq_folded(allowed, requested)),
    }
}

pub(crate) fn instance_ok(
    grant: &Grant,
    input: &AuthzInput,
    matcher: &Matcher<'_>,
    wildcard_matches_missing: bool,
) -> bool {
    let Some(patterns) = grant.resources.instances.as_deref() else {
        return true;
    };
    match input.instance_name() {
        Some(instance) => matcher.any_matches(patterns, instance),
        None => {
            wildcard_matches_missing
                && patterns.iter().any(|pattern| pattern.trim() == ANY_INSTANCE)
        }
    }
}

pub(crate) fn table_ok(grant: &Grant, input: &AuthzInput, matcher: &Matcher<'_>) -> bool {
    let Some(patterns) = grant.resources.tables.as_deref() else {
        return true;
    };
    let Some(table) = input.table_name() else {
        return false;
    };
    matcher.any_matches(patterns, table) || matcher.any_matches(patterns, &qualified_table(input))
}
