//! One-call reconciliation: decode, bind and apply a delta document.

use crate::apply::ApplyStatus;
use crate::construct::{construct_deltas_with, FailureStage, OperationFailure};
use crate::delta::{decode, Document};
use crate::errors::Result;
use crate::identity::{ExplicitOnlyMatch, MatchStrategy, PositionalMatch};
use crate::model::Graph;
use crate::{log_op_end, log_op_error, log_op_start};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How recorded ids are matched in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// Explicit ids, then positional origins for anonymous elements
    #[default]
    Positional,
    /// Explicit ids only
    ExplicitOnly,
}

impl MatchingMode {
    pub fn strategy(&self) -> &'static dyn MatchStrategy {
        match self {
            MatchingMode::Positional => &PositionalMatch,
            MatchingMode::ExplicitOnly => &ExplicitOnlyMatch,
        }
    }
}

/// Caller-facing reconciliation settings
///
/// Every field has a default, so the struct can be embedded in a host
/// application's own configuration file:
///
/// ```
/// use modeldelta_core::reconcile::{MatchingMode, ReconcileOptions};
///
/// let options: ReconcileOptions = serde_json::from_str(r#"{"feature_filters": ["label"]}"#).unwrap();
/// assert_eq!(options.matching, MatchingMode::Positional);
/// assert_eq!(options.filters(), vec!["label"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Feature names whose operations are never applied
    pub feature_filters: Vec<String>,
    pub matching: MatchingMode,
}

impl ReconcileOptions {
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_matching(mut self, matching: MatchingMode) -> Self {
        self.matching = matching;
        self
    }

    pub fn filters(&self) -> Vec<&str> {
        self.feature_filters.iter().map(String::as_str).collect()
    }
}

/// Replay `document` onto `target`
///
/// Dropped document entries, unbound entries and failed operations all end
/// up in the returned status.
///
/// # Errors
/// Fails only when the document itself cannot be decoded.
pub fn reconcile(
    target: &mut Graph,
    document: &Document,
    options: &ReconcileOptions,
) -> Result<ApplyStatus> {
    let start = Instant::now();
    log_op_start!("reconcile", session_id = %document.session_id);

    let decoded = match decode(document) {
        Ok(decoded) => decoded,
        Err(err) => {
            log_op_error!(
                "reconcile",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            return Err(err);
        }
    };

    let dropped: Vec<OperationFailure> = decoded
        .dropped
        .into_iter()
        .map(|d| OperationFailure {
            stage: FailureStage::Decode,
            index: d.index,
            description: format!("document entry {}", d.index),
            error: d.error,
        })
        .collect();

    let plan = construct_deltas_with(target, &decoded.change_set, options.matching.strategy());
    let status = plan.apply(target, &options.filters()).merge(dropped);

    log_op_end!(
        "reconcile",
        duration_ms = start.elapsed().as_millis() as u64,
        failure_count = status.failures().len()
    );
    Ok(status)
}
