//! Turns a detection result into the module's action.

use crate::config::Mode;
use crate::result::DetectionResult;
use bulwark_core::{Action, FieldMap};

pub fn block_reason(result: &DetectionResult) -> String {
    format!(
        "XSS attack detected: {} (Severity: {})",
        result.vector_list(),
        result.severity
    )
}

pub fn sanitize_reason(result: &DetectionResult) -> String {
    format!(
        "XSS sanitized: {} (Severity: {})",
        result.vector_list(),
        result.severity
    )
}

/// Decide the action for one request. `body` and `query` are the working
/// copies, returned to the caller only when sanitizing.
pub fn decide(mode: Mode, result: &DetectionResult, body: FieldMap, query: FieldMap) -> Action {
    if !result.detected {
        return Action::Allow;
    }

    match mode {
        Mode::Report => Action::Allow,
        Mode::Block => Action::block(block_reason(result)),
        Mode::Sanitize | Mode::Remove => Action::Sanitize {
            body,
            query,
            reason: sanitize_reason(result),
        },
    }
}
