//! Error types for host operations

use crate::value::ObjectRef;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by a host while describing or executing members
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// No class with the given ID or name
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Handle does not refer to a live object
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectRef),

    /// Member handle does not exist on the class
    #[error("No such member {member} on {class}")]
    NoSuchMember {
        /// Class name
        class: String,
        /// Member description
        member: String,
    },

    /// Value is not an array
    #[error("Not an array: {0}")]
    NotAnArray(String),

    /// Wrong number of arguments for a method or constructor
    #[error("{member} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        /// Member description
        member: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Instance member accessed without a receiver
    #[error("Instance member {0} requires a receiver")]
    MissingReceiver(String),

    /// Class cannot be defined as requested
    #[error("Invalid class definition {class}: {reason}")]
    InvalidDefinition {
        /// Class name
        class: String,
        /// What is wrong with it
        reason: String,
    },

    /// The member's own code failed
    #[error("{0}")]
    Invocation(String),
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Invocation(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Invocation(s.to_string())
    }
}
