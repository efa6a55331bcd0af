//! Canonical logging macros
//!
//! Every public reconciliation operation brackets its work with these so that
//! start/end/error events share one field vocabulary (see
//! `modeldelta_core_types::schema`).

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use modeldelta_core::log_op_start;
/// log_op_start!("construct_deltas");
/// log_op_start!("construct_deltas", entry_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use modeldelta_core::log_op_end;
/// log_op_end!("apply_deltas", duration_ms = 4);
/// log_op_end!("apply_deltas", duration_ms = 4, failure_count = 0);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `MdError`.
///
/// # Example
///
/// ```
/// # use modeldelta_core::{log_op_error, errors::DeltaError};
/// let err = DeltaError::unresolved("@root/children/Window.0");
/// log_op_error!("reconcile", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let md_err: $crate::errors::MdError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?md_err.kind(),
            err.code = md_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let md_err: $crate::errors::MdError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::modeldelta_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?md_err.kind(),
            err.code = md_err.code(),
            $($field)*
        );
    }};
}
