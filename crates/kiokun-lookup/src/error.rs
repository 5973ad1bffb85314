//! Error types for Kiokun lookups

use thiserror::Error;

/// Failure signals from a fetch backend.
///
/// `NotFound` is an expected outcome and is turned into `LookupOutcome::NotFound`
/// by the client; the other variants surface as [`LookupError`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No document exists at the address
    #[error("no document at {address}")]
    NotFound {
        /// The address that was fetched
        address: String,
    },
    /// Network or filesystem failure other than a missing document
    #[error("transport failure fetching {address}: {reason}")]
    Transport {
        /// The address that was fetched
        address: String,
        /// Backend-specific failure description
        reason: String,
    },
    /// The fetch was abandoned (timeout or explicit cancellation)
    #[error("fetch of {address} cancelled: {reason}")]
    Cancelled {
        /// The address that was fetched
        address: String,
        /// Why the fetch was abandoned
        reason: String,
    },
}

/// Error types for lookups. "Entry does not exist" is not an error.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The fetch backend failed for a reason other than a missing document
    #[error("transport failure for {key:?} at {address}: {reason}")]
    Transport {
        /// Key being resolved when the failure happened
        key: String,
        /// Address that was fetched
        address: String,
        /// Backend-specific failure description
        reason: String,
    },
    /// A document exists but is not a valid entry; the build output is defective
    #[error("malformed entry for {key:?} at {address}: {reason}")]
    Decode {
        /// Key being resolved
        key: String,
        /// Address the payload came from
        address: String,
        /// Parser failure description
        reason: String,
    },
    /// A redirect pointed at another redirect; the build output is defective
    #[error("redirect loop: {origin:?} -> {target:?} -> {next:?}")]
    RedirectLoop {
        /// Key originally requested
        origin: String,
        /// Target of the first redirect
        target: String,
        /// Target named by the second redirect
        next: String,
    },
    /// The lookup was abandoned before completing
    #[error("lookup of {key:?} cancelled: {reason}")]
    Cancelled {
        /// Key being resolved
        key: String,
        /// Why the lookup was abandoned
        reason: String,
    },
    /// The lookup configuration is unusable
    #[error("invalid lookup configuration: {reason}")]
    Config {
        /// What is wrong with the configuration
        reason: String,
    },
}

impl LookupError {
    /// Returns true if this error points at corrupted build data rather than a
    /// transient environment problem.
    pub fn is_data_defect(&self) -> bool {
        matches!(
            self,
            LookupError::Decode { .. } | LookupError::RedirectLoop { .. }
        )
    }

    /// Message suitable for end users: a generic failure, distinct from
    /// "no such entry".
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupError::Cancelled { .. } => "lookup cancelled",
            _ => "dictionary lookup failed",
        }
    }
}

/// Result type alias using LookupError as the error type.
pub type Result<T> = std::result::Result<T, LookupError>;
