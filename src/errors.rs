//! Error types for the resource pool

use thiserror::Error;

/// Opaque error produced by a user-supplied factory or closer.
///
/// The pool carries these through unmodified; it never inspects, wraps, or
/// retries them.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool was shut down; nothing can be acquired from it anymore.
    #[error("pool is closed")]
    Closed,

    /// `release`/`close` was called without a resource. A caller-contract
    /// violation, not a transient condition.
    #[error("nil resource, rejecting")]
    NilResource,

    /// The factory failed to create a resource. Carried verbatim; the
    /// caller decides whether to retry.
    #[error("{0}")]
    Factory(BoxedError),

    /// The closer failed to release a resource.
    #[error("{0}")]
    Closer(BoxedError),
}

impl PoolError {
    /// True for the collaborator-error variants (`Factory`/`Closer`),
    /// false for the pool's own contract errors.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, PoolError::Factory(_) | PoolError::Closer(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_error_message_is_carried_verbatim() {
        let err = PoolError::Factory("connection refused".into());
        assert_eq!(err.to_string(), "connection refused");
        assert!(err.is_collaborator());
    }

    #[test]
    fn contract_errors_are_not_collaborator_errors() {
        assert!(!PoolError::Closed.is_collaborator());
        assert!(!PoolError::NilResource.is_collaborator());
    }
}
