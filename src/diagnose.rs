//! Denial explanations.
//!
//! The message is chosen by an ordered list of stages; the first stage that
//! produces a message wins. Grant stages narrow a funnel so the message names
//! the first dimension that eliminated every remaining grant.

use crate::action::Action;
use crate::cache::{Matcher, PatternCache};
use crate::columns::columns_ok;
use crate::engine::{Decision, Engine, Facts};
use crate::grant::Grant;
use crate::request::{AuthzInput, present};
use crate::resource::{
    QueryFieldsError, check_query_fields, data_source_ok, qualified_table, table_ok,
};
use std::collections::HashSet;

/// Grants surviving each filtering stage.
///
/// Every stage is a subset of the one before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantFunnel {
    /// Every grant of the user.
    pub all: Vec<Grant>,
    /// Grants permitting the action.
    pub after_action: Vec<Grant>,
    /// ...that also permit the data source.
    pub after_data_source: Vec<Grant>,
    /// ...that also permit the instance.
    pub after_instance: Vec<Grant>,
    /// ...that also permit the table.
    pub after_table: Vec<Grant>,
    /// ...that also permit the requested columns.
    pub after_columns: Vec<Grant>,
}

fn narrow(from: &[Grant], keep: impl Fn(&Grant) -> bool) -> Vec<Grant> {
    from.iter().filter(|grant| keep(grant)).cloned().collect()
}

impl GrantFunnel {
    pub(crate) fn build<S, C: PatternCache>(
        engine: &Engine<S, C>,
        grants: &HashSet<&Grant>,
        action: Action,
        input: &AuthzInput,
        matcher: &Matcher<'_>,
    ) -> Self {
        let all: Vec<Grant> = grants.iter().map(|grant| (*grant).clone()).collect();
        let after_action = narrow(&all, |grant| Engine::<S, C>::action_ok(grant, action));
        let after_data_source = narrow(&after_action, |grant| data_source_ok(grant, input));
        let after_instance = narrow(&after_data_source, |grant| {
            engine.instance_matches(grant, input, matcher)
        });
        let after_table = narrow(&after_instance, |grant| table_ok(grant, input, matcher));
        let after_columns = narrow(&after_table, |grant| columns_ok(grant, input));
        Self {
            all,
            after_action,
            after_data_source,
            after_instance,
            after_table,
            after_columns,
        }
    }

    /// Stages in filtering order, starting with the full grant set.
    pub fn stages(&self) -> [&[Grant]; 6] {
        [
            &self.all,
            &self.after_action,
            &self.after_data_source,
            &self.after_instance,
            &self.after_table,
            &self.after_columns,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Granted,
    UnknownUser,
    MissingRequiredFields,
    UnsupportedMethod,
    TypeMismatch,
    QueryFields,
    NoGrants,
    Action,
    DataSource,
    Instance,
    Table,
    Columns,
}

const MESSAGE_ORDER: [Stage; 12] = [
    Stage::Granted,
    Stage::UnknownUser,
    Stage::MissingRequiredFields,
    Stage::UnsupportedMethod,
    Stage::TypeMismatch,
    Stage::QueryFields,
    Stage::NoGrants,
    Stage::Action,
    Stage::DataSource,
    Stage::Instance,
    Stage::Table,
    Stage::Columns,
];

struct Context<'a> {
    decision: Decision,
    facts: &'a Facts,
    input: &'a AuthzInput,
    funnel: Option<&'a GrantFunnel>,
}

impl Context<'_> {
    fn field(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or_default()
    }

    fn action(&self) -> &'static str {
        self.facts.action.map(Action::as_str).unwrap_or_default()
    }
}

fn denied(reason: String) -> Option<String> {
    Some(format!("Insufficient privileges: {reason}"))
}

impl Stage {
    fn message(self, cx: &Context<'_>) -> Option<String> {
        let input = cx.input;
        match self {
            Self::Granted => {
                (cx.decision == Decision::Allowed).then(|| "Access Granted".to_string())
            }
            Self::UnknownUser => {
                (!cx.facts.user_exists).then(|| "User does not exist".to_string())
            }
            Self::MissingRequiredFields => {
                let missing: Vec<&str> = [
                    ("user_id", &input.user_id),
                    ("request.method", &input.request.method),
                    ("query.query_type", &input.query.query_type),
                ]
                .into_iter()
                .filter(|(_, value)| present(value).is_none())
                .map(|(name, _)| name)
                .collect();
                (!missing.is_empty())
                    .then(|| format!("Missing required fields: {}", missing.join(", ")))
            }
            Self::UnsupportedMethod => (!cx.facts.verb_supported()).then(|| {
                format!(
                    "Unsupported request method '{}'",
                    Context::field(&input.request.method)
                )
            }),
            Self::TypeMismatch => (!cx.facts.type_matches).then(|| {
                format!(
                    "Query type '{}' does not match action '{}' derived from request method '{}'",
                    Context::field(&input.query.query_type),
                    cx.action(),
                    Context::field(&input.request.method)
                )
            }),
            Self::QueryFields => match check_query_fields(input) {
                Ok(()) => None,
                Err(QueryFieldsError::MissingDataSource) => {
                    Some("Missing required field: query.data_source".to_string())
                }
                Err(QueryFieldsError::UnknownSource(data_source)) => {
                    Some(format!("Unsupported data_source '{data_source}'"))
                }
                Err(QueryFieldsError::MissingField { field, data_source }) => Some(format!(
                    "Missing required field '{field}' for data_source '{data_source}'"
                )),
            },
            Self::NoGrants => cx.funnel.filter(|funnel| funnel.all.is_empty()).and_then(|_| {
                denied(format!(
                    "user '{}' has no grants.",
                    Context::field(&input.user_id)
                ))
            }),
            Self::Action => cx
                .funnel
                .filter(|funnel| funnel.after_action.is_empty())
                .and_then(|_| {
                    denied(format!(
                        "action '{}' is not permitted by any grant.",
                        cx.action()
                    ))
                }),
            Self::DataSource => cx
                .funnel
                .filter(|funnel| funnel.after_data_source.is_empty())
                .and_then(|_| {
                    denied(format!(
                        "data_source '{}' is not permitted.",
                        Context::field(&input.query.data_source)
                    ))
                }),
            Self::Instance => cx
                .funnel
                .filter(|funnel| funnel.after_instance.is_empty())
                .and_then(|_| {
                    denied(format!(
                        "instance '{}' is not permitted.",
                        Context::field(&input.query.instance)
                    ))
                }),
            Self::Table => cx
                .funnel
                .filter(|funnel| funnel.after_table.is_empty())
                .and_then(|_| {
                    denied(format!(
                        "table '{}' (qualified: '{}') is not permitted.",
                        Context::field(&input.query.table),
                        qualified_table(input)
                    ))
                }),
            Self::Columns => cx
                .funnel
                .filter(|funnel| funnel.after_columns.is_empty())
                .and_then(|_| {
                    denied(
                        "requested column set is not permitted by any matching grant.".to_string(),
                    )
                }),
        }
    }
}

/// Builds the message paired with a decision.
pub(crate) fn diagnose(
    decision: Decision,
    facts: &Facts,
    input: &AuthzInput,
    funnel: Option<&GrantFunnel>,
) -> String {
    let cx = Context {
        decision,
        facts,
        input,
        funnel,
    };
    MESSAGE_ORDER
        .iter()
        .find_map(|stage| stage.message(&cx))
        .unwrap_or_else(|| {
            tracing::error!(
                ?decision,
                ?facts,
                "a grant survived every filter but the request was not allowed"
            );
            "Insufficient privileges".to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineBuilder;
    use crate::grant::{Principal, Role, User};
    use crate::types::{RoleId, UserId};

    fn principal(grants: Vec<Grant>) -> Principal {
        let mut role = Role::new(RoleId::try_from("role_a").unwrap());
        role.grants = grants;
        Principal {
            user: User::new(UserId::try_from("alice").unwrap()).with_role(role.id.clone()),
            roles: vec![role],
        }
    }

    fn message(grants: Vec<Grant>, input: &AuthzInput) -> String {
        let engine = EngineBuilder::new(()).build();
        engine
            .evaluate(input, Some(&principal(grants)))
            .verdict
            .message
    }

    fn input() -> AuthzInput {
        AuthzInput::new("alice", "GET", "SELECT")
            .data_source("aurora")
            .instance("inst-a")
            .table("orders")
            .query_sql("SELECT id FROM orders")
    }

    #[test]
    fn funnel_should_name_the_action() {
        let message = message(vec![Grant::new(["INSERT"])], &input());
        assert_eq!(
            message,
            "Insufficient privileges: action 'SELECT' is not permitted by any grant."
        );
    }

    #[test]
    fn funnel_should_name_the_data_source() {
        let message = message(vec![Grant::new(["SELECT"]).data_source("s3")], &input());
        assert_eq!(
            message,
            "Insufficient privileges: data_source 'aurora' is not permitted."
        );
    }

    #[test]
    fn funnel_should_name_the_instance() {
        let message = message(vec![Grant::new(["SELECT"]).instances(["inst-b*"])], &input());
        assert_eq!(
            message,
            "Insufficient privileges: instance 'inst-a' is not permitted."
        );
    }

    #[test]
    fn funnel_should_name_bare_and_qualified_table() {
        let message = message(vec![Grant::new(["SELECT"]).tables(["customers"])], &input());
        assert_eq!(
            message,
            "Insufficient privileges: table 'orders' (qualified: 'inst-a.orders') is not permitted."
        );
    }

    #[test]
    fn funnel_should_name_the_column_set() {
        let grant = Grant::new(["SELECT"]).columns_allow(["id"]);
        let message = message(vec![grant], &input().columns(["id", "ssn"]));
        assert_eq!(
            message,
            "Insufficient privileges: requested column set is not permitted by any matching grant."
        );
    }

    #[test]
    fn funnel_should_narrow_from_previous_stage_only() {
        // The s3 grant permits the instance, the aurora grant does not; the
        // instance stage must only see the aurora grant and therefore be empty.
        let grants = vec![
            Grant::new(["SELECT"]).data_source("s3"),
            Grant::new(["SELECT"]).data_source("aurora").instances(["inst-z"]),
        ];
        let message = message(grants, &input());
        assert_eq!(
            message,
            "Insufficient privileges: instance 'inst-a' is not permitted."
        );
    }

    #[test]
    fn stages_should_be_monotonic() {
        let grants = vec![
            Grant::new(["*"]),
            Grant::new(["DELETE"]),
            Grant::new(["SELECT"]).data_source("snowflake"),
            Grant::new(["SELECT"]).instances(["inst-*"]).tables(["orders"]),
            Grant::new(["SELECT"]).tables(["inst-a.orders"]).columns_allow(["id"]),
        ];
        let engine = EngineBuilder::new(()).build();
        let input = input().columns(["id", "total"]);
        let funnel = engine
            .evaluate(&input, Some(&principal(grants)))
            .funnel
            .unwrap();

        let stages = funnel.stages();
        for pair in stages.windows(2) {
            assert!(pair[1].iter().all(|grant| pair[0].contains(grant)));
        }
        assert_eq!(funnel.all.len(), 5);
        assert_eq!(funnel.after_action.len(), 4);
        assert_eq!(funnel.after_data_source.len(), 3);
        assert_eq!(funnel.after_columns.len(), 2);
    }
}
