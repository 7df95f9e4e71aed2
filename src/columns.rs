use crate::grant::Grant;
use crate::request::AuthzInput;
use crate::resource::qualified_table;
use crate::types::fold;
use std::collections::{HashMap, HashSet};

fn folded_set<'a>(values: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
    values
        .into_iter()
        .map(|value| fold(value).into_owned())
        .collect()
}

fn all_allowed(requested: &[String], allowed: &HashSet<String>) -> bool {
    requested
        .iter()
        .all(|column| allowed.contains(fold(column).as_ref()))
}

/// Checks `request.columns` against the grant's global allow-list.
pub(crate) fn global_columns_ok(grant: &Grant, input: &AuthzInput) -> bool {
    let (Some(allow), Some(requested)) = (
        grant.resources.columns_allow.as_ref(),
        input.requested_columns(),
    ) else {
        return true;
    };
    all_allowed(requested, &folded_set(allow))
}

/// Checks `request.columns` against the allow-list for the qualified table,
/// when the grant names that table.
pub(crate) fn table_columns_ok(grant: &Grant, input: &AuthzInput) -> bool {
    let (Some(entries), Some(requested)) = (
        grant.resources.columns_by_table.as_ref(),
        input.requested_columns(),
    ) else {
        return true;
    };

    let mut by_table: HashMap<String, HashSet<String>> = HashMap::new();
    for entry in entries {
        by_table
            .entry(fold(&entry.table).into_owned())
            .or_default()
            .extend(folded_set(&entry.columns));
    }

    match by_table.get(&qualified_table(input)) {
        Some(allowed) => all_allowed(requested, allowed),
        None => true,
    }
}

pub(crate) fn columns_ok(grant: &Grant, input: &AuthzInput) -> bool {
    global_columns_ok(grant, input) && table_columns_ok(grant, input)
}
