//! Error currency of the crate.
//!
//! Errors travel through streams as values: a producer hands the same error
//! to every live subscriber of a multicast source, so the payload is
//! reference-counted rather than boxed.

use std::sync::Arc;

/// Shared error payload carried by error-resume signals, failed completions,
/// and setup failures.
///
/// One error instance can reach every subscriber of a multicast source, which
/// is why this is an `Arc` and not a `Box`.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wraps any error into the crate's shared payload.
pub fn shared<E>(error: E) -> SharedError
where
  E: std::error::Error + Send + Sync + 'static,
{
  Arc::new(error)
}
