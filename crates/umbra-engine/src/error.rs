//! Binding errors

use std::fmt;

use umbra_sdk::HostError;

/// Result type for binding operations
pub type BindResult<T> = Result<T, BindError>;

/// Where a binding error happened: the capability, the capability member
/// being resolved or called (if any) and the target type (once known).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSite {
    /// Capability type name
    pub capability: String,
    /// Capability member name
    pub member: Option<String>,
    /// Target type name
    pub target: Option<String>,
}

impl CallSite {
    /// Site for a capability as a whole
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            member: None,
            target: None,
        }
    }

    /// Attach the capability member
    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Attach the target type
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.capability)?;
        if let Some(member) = &self.member {
            write!(f, "::{}", member)?;
        }
        if let Some(target) = &self.target {
            write!(f, " -> {}", target)?;
        }
        Ok(())
    }
}

/// Errors raised while resolving or dispatching a binding
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    /// Target object is not assignable to the capability's target type
    #[error("Type mismatch at {site}: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Call site
        site: CallSite,
        /// Expected type name
        expected: String,
        /// Actual type name
        actual: String,
    },

    /// No real member matches the capability member
    #[error("No {kind} {name}({shape}) at {site}")]
    MemberNotFound {
        /// Call site
        site: CallSite,
        /// "method", "field" or "constructor"
        kind: &'static str,
        /// Attempted real name
        name: String,
        /// Attempted argument shape
        shape: String,
    },

    /// Static/instance mismatch between a capability member and the target
    #[error("Scope error at {site}: {reason}")]
    Scope {
        /// Call site
        site: CallSite,
        /// What does not line up
        reason: String,
    },

    /// Field accessor called with neither zero nor one argument
    #[error("Cannot tell getter from setter at {site}: called with {got} arguments")]
    AccessorArity {
        /// Call site
        site: CallSite,
        /// Supplied argument count
        got: usize,
    },

    /// Array wrap/unwrap given a non-array or the wrong component kind
    #[error("Array shape error at {site}: {detail}")]
    ArrayShape {
        /// Call site
        site: CallSite,
        /// What is wrong with the value or the declared shape
        detail: String,
    },

    /// Called member is not described on the capability
    #[error("Unclassified member at {site}: no access marker describes it")]
    UnclassifiedMember {
        /// Call site
        site: CallSite,
    },

    /// A strategy object could not be obtained through its discovery order
    #[error("Could not obtain an instance of {provider} (tried: {})", .attempted.join(", "))]
    StrategyInstantiation {
        /// Provider type name
        provider: String,
        /// Discovery steps tried, in order
        attempted: Vec<&'static str>,
    },

    /// No strategy names a target type, or the named type does not exist
    #[error("Unresolved target type at {site}: {detail}")]
    UnresolvedTarget {
        /// Call site
        site: CallSite,
        /// Why resolution failed
        detail: String,
    },

    /// Capability member called with the wrong number of arguments
    #[error("{site} declares {expected} parameter(s), called with {got}")]
    ArgumentCount {
        /// Call site
        site: CallSite,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Capability description is malformed
    #[error("Invalid capability {capability}: {reason}")]
    InvalidCapability {
        /// Capability type name
        capability: String,
        /// What is wrong with it
        reason: String,
    },

    /// The host failed while describing or executing a member
    #[error("Host error at {site}: {source}")]
    Host {
        /// Call site
        site: CallSite,
        /// Underlying host error
        #[source]
        source: HostError,
    },
}

impl BindError {
    /// Wrap a host error with its call site
    pub fn host(site: CallSite, source: HostError) -> Self {
        BindError::Host { site, source }
    }

    /// Call site of the error, if it has one
    pub fn site(&self) -> Option<&CallSite> {
        match self {
            BindError::TypeMismatch { site, .. }
            | BindError::MemberNotFound { site, .. }
            | BindError::Scope { site, .. }
            | BindError::AccessorArity { site, .. }
            | BindError::ArrayShape { site, .. }
            | BindError::UnclassifiedMember { site }
            | BindError::UnresolvedTarget { site, .. }
            | BindError::ArgumentCount { site, .. }
            | BindError::Host { site, .. } => Some(site),
            BindError::StrategyInstantiation { .. } | BindError::InvalidCapability { .. } => None,
        }
    }
}

/// Attach a call site to host results
pub(crate) trait HostResultExt<T> {
    fn at(self, site: impl FnOnce() -> CallSite) -> BindResult<T>;
}

impl<T> HostResultExt<T> for Result<T, HostError> {
    fn at(self, site: impl FnOnce() -> CallSite) -> BindResult<T> {
        self.map_err(|source| BindError::host(site(), source))
    }
}
