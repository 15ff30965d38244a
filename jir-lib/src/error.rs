use thiserror::Error;

/// A malformed program. These are reported when a program is built or
/// loaded, analyses assume a well-formed program afterwards.
#[derive(Error, Debug)]
pub enum IrError {
    #[error("invalid {kind} id {id}")]
    InvalidId { kind: &'static str, id: usize },

    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("malformed method signature `{0}`")]
    MalformedSignature(String),

    #[error("branch target {target} out of range in method `{method}`")]
    BranchTarget { method: String, target: usize },

    #[error("class `{0}` is its own superclass")]
    CyclicHierarchy(String),

    #[error("unbound label in method `{0}`")]
    UnboundLabel(String),

    #[error("variable `{var}` used in method `{method}` belongs to another method")]
    ForeignVariable { method: String, var: String },

    #[error("the parameters of method `{0}` do not match its signature")]
    SignatureMismatch(String),

    #[error("non-static method `{0}` has no `this` variable")]
    MissingThis(String),

    #[error("the program has no entry method")]
    NoEntryMethod,

    #[error("failed to decode program: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems with a taint configuration. The configuration is validated
/// eagerly when the taint analysis is set up.
#[derive(Error, Debug)]
pub enum TaintConfigError {
    #[error("failed to decode taint configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Ir(#[from] IrError),

    #[error("invalid taint position `{0}`, expected an argument index, `base` or `result`")]
    InvalidPosition(String),

    #[error("argument index {index} out of range for `{method}`")]
    IndexOutOfRange { method: String, index: usize },

    #[error("`{method}` has no {position} position")]
    MissingPosition {
        method: String,
        position: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{analysis} did not reach a fixed point within the node limit")]
    NoFixpoint { analysis: &'static str },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    TaintConfig(#[from] TaintConfigError),
}
