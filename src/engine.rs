use crate::action::Action;
use crate::cache::{Matcher, NoCache, PatternCache};
use crate::columns::columns_ok;
use crate::diagnose::{GrantFunnel, diagnose};
use crate::error::{Error, Result};
use crate::grant::{Grant, Principal};
use crate::pattern::PatternSyntax;
use crate::request::{AuthzInput, present};
use crate::resource::{check_query_fields, data_source_ok, instance_ok, table_ok};
use crate::store::Store;
use crate::types::UserId;
use std::collections::HashSet;

/// Liveness marker reported by [`Engine::status`].
pub const STATUS: &str = "OK";

/// Authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// A grant authorizes the request.
    Allowed,
    /// The request is well formed but not authorized.
    Denied,
    /// The request could not be evaluated.
    Indeterminate,
}

/// Decision plus the reason shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Verdict {
    /// Outcome.
    #[cfg_attr(feature = "serde", serde(rename = "Decision"))]
    pub decision: Decision,
    /// Human-readable reason.
    #[cfg_attr(feature = "serde", serde(rename = "Message"))]
    pub message: String,
}

/// Guard that produced a decision, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionRule {
    /// Every check passed and a grant authorizes the request.
    Allow,
    /// The declared query type disagrees with the verb.
    TypeMismatch,
    /// Every precondition passed but no grant authorizes the request.
    NoMatchingGrant,
    /// `user_id`, `request.method` or `query.query_type` is missing.
    MissingRequiredFields,
    /// The user is not in the database.
    UnknownUser,
    /// `query.data_source` is missing.
    MissingDataSource,
    /// The source-specific query field is missing or the source is unknown.
    MissingQueryFields,
    /// The verb does not map to an action.
    UnsupportedMethod,
    /// No guard held.
    Fallback,
}

const DECISION_ORDER: [DecisionRule; 8] = [
    DecisionRule::Allow,
    DecisionRule::TypeMismatch,
    DecisionRule::NoMatchingGrant,
    DecisionRule::MissingRequiredFields,
    DecisionRule::UnknownUser,
    DecisionRule::MissingDataSource,
    DecisionRule::MissingQueryFields,
    DecisionRule::UnsupportedMethod,
];

impl DecisionRule {
    fn holds(self, facts: &Facts) -> bool {
        match self {
            Self::Allow => facts.type_ok() && facts.query_fields_ok && facts.granted,
            Self::TypeMismatch => facts.basic_ok() && !facts.type_matches,
            Self::NoMatchingGrant => facts.type_ok() && facts.query_fields_ok && !facts.granted,
            Self::MissingRequiredFields => !facts.required,
            Self::UnknownUser => facts.required && !facts.user_exists,
            Self::MissingDataSource => {
                facts.required && facts.verb_supported() && !facts.data_source_present
            }
            Self::MissingQueryFields => {
                facts.required && facts.user_exists && facts.type_matches && !facts.query_fields_ok
            }
            Self::UnsupportedMethod => {
                facts.required && facts.user_exists && !facts.verb_supported()
            }
            Self::Fallback => true,
        }
    }

    /// Decision this guard yields.
    pub fn decision(self) -> Decision {
        match self {
            Self::Allow => Decision::Allowed,
            Self::TypeMismatch | Self::NoMatchingGrant => Decision::Denied,
            Self::MissingRequiredFields
            | Self::UnknownUser
            | Self::MissingDataSource
            | Self::MissingQueryFields
            | Self::UnsupportedMethod
            | Self::Fallback => Decision::Indeterminate,
        }
    }
}

/// Precondition facts derived once per request.
#[derive(Debug, Clone)]
pub(crate) struct Facts {
    pub(crate) required: bool,
    pub(crate) user_exists: bool,
    pub(crate) action: Option<Action>,
    pub(crate) type_matches: bool,
    pub(crate) data_source_present: bool,
    pub(crate) query_fields_ok: bool,
    pub(crate) granted: bool,
}

impl Facts {
    pub(crate) fn verb_supported(&self) -> bool {
        self.action.is_some()
    }

    pub(crate) fn basic_ok(&self) -> bool {
        self.required && self.user_exists && self.verb_supported()
    }

    pub(crate) fn type_ok(&self) -> bool {
        self.basic_ok() && self.type_matches
    }
}

/// Verdict together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    /// Decision and message.
    pub verdict: Verdict,
    /// Guard that decided.
    pub rule: DecisionRule,
    /// Stage-by-stage grant filtering, when the user and action are known.
    pub funnel: Option<GrantFunnel>,
}

/// Query authorization engine with pluggable store and pattern cache.
#[derive(Debug)]
pub struct Engine<S, C = NoCache> {
    store: S,
    cache: C,
    pattern_syntax: PatternSyntax,
    wildcard_matches_missing_instance: bool,
}

/// Builder for [`Engine`].
pub struct EngineBuilder<S, C = NoCache> {
    store: S,
    cache: C,
    pattern_syntax: PatternSyntax,
    wildcard_matches_missing_instance: bool,
}

impl<S> EngineBuilder<S, NoCache> {
    /// Creates a new builder with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: NoCache,
            pattern_syntax: PatternSyntax::Strict,
            wildcard_matches_missing_instance: false,
        }
    }
}

impl<S, C> EngineBuilder<S, C> {
    /// Sets how globs are translated. Defaults to [`PatternSyntax::Strict`].
    pub fn pattern_syntax(mut self, syntax: PatternSyntax) -> Self {
        self.pattern_syntax = syntax;
        self
    }

    /// Lets an instance list containing `"*"` match requests without an
    /// instance. Off by default.
    pub fn wildcard_matches_missing_instance(mut self, on: bool) -> Self {
        self.wildcard_matches_missing_instance = on;
        self
    }

    /// Sets the pattern cache implementation.
    pub fn pattern_cache<C2: PatternCache>(self, cache: C2) -> EngineBuilder<S, C2> {
        EngineBuilder {
            store: self.store,
            cache,
            pattern_syntax: self.pattern_syntax,
            wildcard_matches_missing_instance: self.wildcard_matches_missing_instance,
        }
    }

    /// Builds the engine.
    pub fn build(self) -> Engine<S, C> {
        Engine {
            store: self.store,
            cache: self.cache,
            pattern_syntax: self.pattern_syntax,
            wildcard_matches_missing_instance: self.wildcard_matches_missing_instance,
        }
    }
}

/// Union of every grant across the principal's roles.
pub fn grants_for(principal: &Principal) -> HashSet<&Grant> {
    principal
        .roles
        .iter()
        .flat_map(|role| role.grants.iter())
        .collect()
}

impl<S, C> Engine<S, C> {
    /// Static liveness marker.
    pub fn status(&self) -> &'static str {
        STATUS
    }

    pub(crate) fn action_ok(grant: &Grant, action: Action) -> bool {
        grant.actions.iter().any(|entry| action.permitted_by(entry))
    }

    pub(crate) fn instance_matches(
        &self,
        grant: &Grant,
        input: &AuthzInput,
        matcher: &Matcher<'_>,
    ) -> bool {
        instance_ok(grant, input, matcher, self.wildcard_matches_missing_instance)
    }

    fn permits(
        &self,
        grant: &Grant,
        action: Action,
        input: &AuthzInput,
        matcher: &Matcher<'_>,
    ) -> bool {
        Self::action_ok(grant, action)
            && data_source_ok(grant, input)
            && self.instance_matches(grant, input, matcher)
            && table_ok(grant, input, matcher)
            && columns_ok(grant, input)
    }
}

impl<S, C> Engine<S, C>
where
    S: Store,
    C: PatternCache,
{
    /// Decides a request.
    ///
    /// Incomplete or malformed requests yield [`Decision::Indeterminate`];
    /// only store failures are errors.
    pub async fn decide(&self, input: &AuthzInput) -> Result<Verdict> {
        Ok(self.explain(input).await?.verdict)
    }

    /// Decides a JSON request document.
    ///
    /// A document that does not fit the request shape is
    /// [`Decision::Indeterminate`], not an error.
    #[cfg(feature = "serde")]
    pub async fn decide_json(&self, input: serde_json::Value) -> Result<Verdict> {
        match serde_json::from_value::<AuthzInput>(input) {
            Ok(input) => self.decide(&input).await,
            Err(err) => {
                tracing::debug!(error = %err, "malformed authorization request");
                Ok(Verdict {
                    decision: Decision::Indeterminate,
                    message: format!("Malformed request: {err}"),
                })
            }
        }
    }

    /// Decides a request and returns the evidence used to explain it.
    pub async fn explain(&self, input: &AuthzInput) -> Result<Explanation> {
        let principal = self.lookup(input).await?;
        Ok(self.evaluate(input, principal.as_ref()))
    }

    async fn lookup(&self, input: &AuthzInput) -> Result<Option<Principal>> {
        let Some(raw) = present(&input.user_id) else {
            return Ok(None);
        };
        let Ok(id) = UserId::new(raw) else {
            tracing::debug!(user = raw, "user id is not a valid identifier");
            return Ok(None);
        };
        self.store.principal(&id).await.map_err(Error::from)
    }
}

impl<S, C> Engine<S, C>
where
    C: PatternCache,
{
    pub(crate) fn matcher(&self) -> Matcher<'_> {
        Matcher::new(&self.cache, self.pattern_syntax)
    }

    /// Evaluates a request against an already resolved principal.
    pub fn evaluate(&self, input: &AuthzInput, principal: Option<&Principal>) -> Explanation {
        let matcher = self.matcher();
        let action = present(&input.request.method).and_then(Action::from_method);
        let query_type = present(&input.query.query_type);
        let grants = principal.map(grants_for).unwrap_or_default();

        let mut facts = Facts {
            required: present(&input.user_id).is_some()
                && present(&input.request.method).is_some()
                && query_type.is_some(),
            user_exists: principal.is_some(),
            action,
            type_matches: match (action, query_type) {
                (Some(action), Some(query_type)) => action.matches_query_type(query_type),
                _ => false,
            },
            data_source_present: present(&input.query.data_source).is_some(),
            query_fields_ok: check_query_fields(input).is_ok(),
            granted: false,
        };
        if facts.type_ok()
            && facts.query_fields_ok
            && let Some(action) = action
        {
            facts.granted = grants
                .iter()
                .any(|grant| self.permits(grant, action, input, &matcher));
        }

        let rule = DECISION_ORDER
            .iter()
            .copied()
            .find(|rule| rule.holds(&facts))
            .unwrap_or(DecisionRule::Fallback);
        if rule == DecisionRule::Fallback {
            tracing::error!(?facts, "no decision guard matched; returning indeterminate");
        }
        let decision = rule.decision();

        let funnel = match (principal, action) {
            (Some(_), Some(action)) => {
                Some(GrantFunnel::build(self, &grants, action, input, &matcher))
            }
            _ => None,
        };
        let message = diagnose(decision, &facts, input, funnel.as_ref());

        tracing::debug!(
            user = input.user_id.as_deref().unwrap_or_default(),
            action = action.map(Action::as_str).unwrap_or_default(),
            ?decision,
            ?rule,
            "authorization decided"
        );

        Explanation {
            verdict: Verdict { decision, message },
            rule,
            funnel,
        }
    }
}
