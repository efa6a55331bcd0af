use thiserror::Error;

/// Result type alias using DeltaError
pub type Result<T> = std::result::Result<T, DeltaError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// in the ModelDelta system. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdErrorKind {
    // Schema
    UnknownFeature,
    UnknownElementKind,
    TypeMismatch,

    // Graph structure
    NotFound,
    CycleDetected,
    DuplicateId,
    ConstraintViolation,

    // Reconciliation
    UnresolvedElement,

    // Delta documents
    InvalidDocument,
    UnsupportedFormatVersion,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl MdErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            MdErrorKind::UnknownFeature => "ERR_UNKNOWN_FEATURE",
            MdErrorKind::UnknownElementKind => "ERR_UNKNOWN_ELEMENT_KIND",
            MdErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            MdErrorKind::NotFound => "ERR_NOT_FOUND",
            MdErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            MdErrorKind::DuplicateId => "ERR_DUPLICATE_ID",
            MdErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            MdErrorKind::UnresolvedElement => "ERR_UNRESOLVED_ELEMENT",
            MdErrorKind::InvalidDocument => "ERR_INVALID_DOCUMENT",
            MdErrorKind::UnsupportedFormatVersion => "ERR_UNSUPPORTED_FORMAT_VERSION",
            MdErrorKind::Io => "ERR_IO",
            MdErrorKind::Serialization => "ERR_SERIALIZATION",
            MdErrorKind::Persistence => "ERR_PERSISTENCE",
            MdErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus optional
/// context (operation, element id, feature name).
#[derive(Debug, Clone)]
pub struct MdError {
    kind: MdErrorKind,
    op: Option<String>,
    element_id: Option<String>,
    feature: Option<String>,
    message: String,
}

impl MdError {
    /// Create a new error with the specified kind
    pub fn new(kind: MdErrorKind) -> Self {
        Self {
            kind,
            op: None,
            element_id: None,
            feature: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add element id context
    pub fn with_element_id(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    /// Add feature context
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> MdErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the element id context, if any
    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// Get the feature context, if any
    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for MdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(element_id) = &self.element_id {
            write!(f, " (element_id: {})", element_id)?;
        }
        if let Some(feature) = &self.feature {
            write!(f, " (feature: {})", feature)?;
        }
        Ok(())
    }
}

impl std::error::Error for MdError {}

// ========== End Error Facility ==========

/// Error taxonomy for ModelDelta operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeltaError {
    // ===== Schema Errors =====
    /// Feature name is not declared for the element kind
    #[error("Unknown feature '{feature}' on element kind {kind}")]
    UnknownFeature { kind: String, feature: String },

    /// Element kind name is not part of the schema
    #[error("Unknown element kind: {kind}")]
    UnknownElementKind { kind: String },

    /// Value or operation does not fit the declared feature type
    #[error("Type mismatch on feature '{feature}': expected {expected}, found {found}")]
    TypeMismatch {
        feature: String,
        expected: String,
        found: String,
    },

    // ===== Graph Errors =====
    /// Node handle does not belong to the graph
    #[error("Node not found: {node}")]
    NodeNotFound { node: String },

    /// Inserting the element would make it contain itself
    #[error("Cycle detected: element {node} cannot be contained by its own descendant")]
    CycleDetected { node: String },

    /// Two reachable elements carry the same stable id
    #[error("Duplicate stable id: {stable_id}")]
    DuplicateStableId { stable_id: String },

    /// Element's recorded container does not list it
    #[error("Element {node} records container {parent} but is not listed in '{feature}'")]
    ParentMismatch {
        node: String,
        parent: String,
        feature: String,
    },

    /// Containment list holds an element that records a different container
    #[error("Element {node} is listed in {owner}.'{feature}' but does not record it as its container")]
    ContainerMismatch {
        node: String,
        owner: String,
        feature: String,
    },

    /// List or reference points at a node missing from the graph
    #[error("Element {owner} points at missing node {node} through '{feature}'")]
    MissingMember {
        owner: String,
        feature: String,
        node: String,
    },

    /// Element is listed in more than one containment list
    #[error("Element {node} is contained {count} times")]
    MultipleContainers { node: String, count: usize },

    // ===== Reconciliation Errors =====
    /// Stable id could not be matched to an element of the target graph
    #[error("Unresolved element: {element_id}")]
    UnresolvedElement { element_id: String },

    // ===== Document Errors =====
    /// Delta document is not decodable
    #[error("Invalid delta document: {reason}")]
    InvalidDocument { reason: String },

    /// Delta document was written by an unsupported format version
    #[error("Unsupported delta document format version {found} (supported: {supported})")]
    UnsupportedFormatVersion { found: u32, supported: u32 },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DeltaError {
    /// Convenience constructor for unknown features
    pub fn unknown_feature(kind: impl std::fmt::Display, feature: &str) -> Self {
        DeltaError::UnknownFeature {
            kind: kind.to_string(),
            feature: feature.to_string(),
        }
    }

    /// Convenience constructor for type mismatches
    pub fn type_mismatch(feature: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        DeltaError::TypeMismatch {
            feature: feature.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Convenience constructor for unresolved elements
    pub fn unresolved(element_id: impl Into<String>) -> Self {
        DeltaError::UnresolvedElement {
            element_id: element_id.into(),
        }
    }

    /// Canonical kind of this error
    pub fn kind(&self) -> MdErrorKind {
        match self {
            DeltaError::UnknownFeature { .. } => MdErrorKind::UnknownFeature,
            DeltaError::UnknownElementKind { .. } => MdErrorKind::UnknownElementKind,
            DeltaError::TypeMismatch { .. } => MdErrorKind::TypeMismatch,
            DeltaError::NodeNotFound { .. } => MdErrorKind::NotFound,
            DeltaError::CycleDetected { .. } => MdErrorKind::CycleDetected,
            DeltaError::DuplicateStableId { .. } => MdErrorKind::DuplicateId,
            DeltaError::ParentMismatch { .. }
            | DeltaError::ContainerMismatch { .. }
            | DeltaError::MissingMember { .. }
            | DeltaError::MultipleContainers { .. } => MdErrorKind::ConstraintViolation,
            DeltaError::UnresolvedElement { .. } => MdErrorKind::UnresolvedElement,
            DeltaError::InvalidDocument { .. } => MdErrorKind::InvalidDocument,
            DeltaError::UnsupportedFormatVersion { .. } => MdErrorKind::UnsupportedFormatVersion,
            DeltaError::Serialization { .. } => MdErrorKind::Serialization,
            DeltaError::Internal { .. } => MdErrorKind::Internal,
        }
    }
}

/// Conversion from DeltaError to MdError
impl From<DeltaError> for MdError {
    fn from(err: DeltaError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            DeltaError::UnknownFeature { feature, .. } => {
                MdError::new(kind).with_feature(feature).with_message(message)
            }
            DeltaError::TypeMismatch { feature, .. } => {
                MdError::new(kind).with_feature(feature).with_message(message)
            }
            DeltaError::NodeNotFound { node } | DeltaError::CycleDetected { node } => {
                MdError::new(kind).with_element_id(node).with_message(message)
            }
            DeltaError::DuplicateStableId { stable_id } => MdError::new(kind)
                .with_element_id(stable_id)
                .with_message(message),
            DeltaError::ParentMismatch { node, feature, .. } => MdError::new(kind)
                .with_element_id(node)
                .with_feature(feature)
                .with_message(message),
            DeltaError::ContainerMismatch { node, feature, .. } => MdError::new(kind)
                .with_element_id(node)
                .with_feature(feature)
                .with_message(message),
            DeltaError::MissingMember { owner, feature, .. } => MdError::new(kind)
                .with_element_id(owner)
                .with_feature(feature)
                .with_message(message),
            DeltaError::MultipleContainers { node, .. } => {
                MdError::new(kind).with_element_id(node).with_message(message)
            }
            DeltaError::UnresolvedElement { element_id } => MdError::new(kind)
                .with_element_id(element_id)
                .with_op("resolve")
                .with_message(message),
            DeltaError::InvalidDocument { .. } | DeltaError::UnsupportedFormatVersion { .. } => {
                MdError::new(kind).with_op("decode").with_message(message)
            }
            DeltaError::UnknownElementKind { .. }
            | DeltaError::Serialization { .. }
            | DeltaError::Internal { .. } => MdError::new(kind).with_message(message),
        }
    }
}

/// Conversion from serde_json::Error to DeltaError
impl From<serde_json::Error> for DeltaError {
    fn from(err: serde_json::Error) -> Self {
        DeltaError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconciliation_error_kind_codes() {
        let cases = [
            (MdErrorKind::UnknownFeature, "ERR_UNKNOWN_FEATURE"),
            (MdErrorKind::UnresolvedElement, "ERR_UNRESOLVED_ELEMENT"),
            (MdErrorKind::TypeMismatch, "ERR_TYPE_MISMATCH"),
            (MdErrorKind::InvalidDocument, "ERR_INVALID_DOCUMENT"),
            (MdErrorKind::Persistence, "ERR_PERSISTENCE"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_delta_error_maps_to_kind() {
        let err = DeltaError::unresolved("@root/children/Window.0");
        assert_eq!(err.kind(), MdErrorKind::UnresolvedElement);

        let md: MdError = err.into();
        assert_eq!(md.code(), "ERR_UNRESOLVED_ELEMENT");
        assert_eq!(md.element_id(), Some("@root/children/Window.0"));
    }

    #[test]
    fn test_unknown_feature_carries_feature_context() {
        let md: MdError = DeltaError::unknown_feature("Window", "colour").into();
        assert_eq!(md.kind(), MdErrorKind::UnknownFeature);
        assert_eq!(md.feature(), Some("colour"));
        assert!(md.message().contains("colour"));
    }

    #[test]
    fn test_md_error_display_includes_context() {
        let err = MdError::new(MdErrorKind::NotFound)
            .with_op("load_graph")
            .with_element_id("main")
            .with_message("graph file missing");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_NOT_FOUND]"));
        assert!(text.contains("load_graph"));
        assert!(text.contains("graph file missing"));
        assert!(text.contains("main"));
    }

    #[test]
    fn test_serde_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: DeltaError = parse.unwrap_err().into();
        assert!(matches!(err, DeltaError::Serialization { .. }));
    }
}
