// ============================================================
// Layer 3 — Resolution / Construction Errors
// ============================================================
// Two failure classes exist when turning a descriptor into a
// live object:
//
//   ResolutionError — the (module, class) pair is not registered
//   AssemblyError   — resolution succeeded but construction failed
//                     (bad kwargs, unreadable pretrained weights)
//
// Both are fatal; the application layer converts them into
// anyhow errors with `?` and the process exits non-zero.

use thiserror::Error;

/// Lookup failure in a component registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No module with this path is registered for the component kind
    #[error("unknown {kind} module '{module}' (registered: {available})")]
    UnknownModule {
        kind:      &'static str,
        module:    String,
        available: String,
    },

    /// The module exists but does not expose the requested class
    #[error("{kind} module '{module}' has no class '{class}'")]
    UnknownClass {
        kind:   &'static str,
        module: String,
        class:  String,
    },
}

/// Failure while building a resolved component.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The constructor rejected its keyword arguments
    #[error("cannot construct '{class}' from kwargs: {source}")]
    Construction {
        class:  String,
        #[source]
        source: serde_json::Error,
    },

    /// Arguments decoded but describe an impossible component
    #[error("invalid arguments for '{class}': {reason}")]
    InvalidArguments {
        class:  String,
        reason: String,
    },

    /// Pretrained weights could not be loaded into the component
    #[error("cannot load pretrained weights for '{class}' from '{path}': {reason}")]
    Pretrained {
        class:  String,
        path:   String,
        reason: String,
    },
}

impl AssemblyError {
    pub fn construction(class: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Construction { class: class.into(), source }
    }

    pub fn invalid(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments { class: class.into(), reason: reason.into() }
    }
}

pub type AssemblyResult<T> = Result<T, AssemblyError>;
