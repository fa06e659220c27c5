//! Actions produced by inspection modules and their reconciliation.

use crate::context::RequestContext;
use crate::value::FieldMap;
use serde::Serialize;

/// The outcome of one module's analysis of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Let the request through unchanged
    Allow,
    /// Terminate the request
    Block { reason: String },
    /// Continue with cleaned copies of body and query
    Sanitize {
        body: FieldMap,
        query: FieldMap,
        reason: String,
    },
}

impl Action {
    pub fn block(reason: impl Into<String>) -> Self {
        Self::Block {
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    pub fn is_sanitize(&self) -> bool {
        matches!(self, Self::Sanitize { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Block { reason } | Self::Sanitize { reason, .. } => Some(reason),
        }
    }
}

/// Host-facing decision after reconciling every module's action.
///
/// Any block wins over any sanitize, which wins over allow.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Rewrite {
        body: FieldMap,
        query: FieldMap,
        reasons: Vec<String>,
    },
    Reject {
        reasons: Vec<String>,
    },
}

impl Verdict {
    /// HTTP status the host should answer with, if the request must stop.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Verdict::Reject { .. } => Some(403),
            _ => None,
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject { .. })
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Verdict::Pass => &[],
            Verdict::Rewrite { reasons, .. } | Verdict::Reject { reasons } => reasons,
        }
    }

    /// Write a rewrite back into the context. Returns false for a rejection,
    /// in which case the host must not continue.
    pub fn apply_to(self, ctx: &mut RequestContext) -> bool {
        match self {
            Verdict::Pass => true,
            Verdict::Rewrite { body, query, .. } => {
                ctx.replace_fields(body, query);
                true
            }
            Verdict::Reject { .. } => false,
        }
    }
}

/// Reconcile the actions of all modules into one verdict.
///
/// When several modules sanitize, the last one's copies are used.
pub fn resolve(actions: impl IntoIterator<Item = Action>) -> Verdict {
    let mut blocked = Vec::new();
    let mut rewrite: Option<(FieldMap, FieldMap)> = None;
    let mut sanitize_reasons = Vec::new();

    for action in actions {
        match action {
            Action::Allow => {}
            Action::Block { reason } => blocked.push(reason),
            Action::Sanitize {
                body,
                query,
                reason,
            } => {
                sanitize_reasons.push(reason);
                rewrite = Some((body, query));
            }
        }
    }

    if !blocked.is_empty() {
        return Verdict::Reject { reasons: blocked };
    }

    match rewrite {
        Some((body, query)) => Verdict::Rewrite {
            body,
            query,
            reasons: sanitize_reasons,
        },
        None => Verdict::Pass,
    }
}
