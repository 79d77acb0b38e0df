//! Error types for cache operations.

use thiserror::Error;

/// Recoverable outcomes of the conditional write operations.
///
/// Both variants are expected branches of normal control flow, not failures
/// of the store itself; every other cache operation is total and reports
/// absence through `Option`/`bool` instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `add` found a live entry already stored under the key.
    #[error("item already exists")]
    AlreadyExists,

    /// `replace` found no live entry under the key.
    #[error("item does not exist")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(Error::AlreadyExists.to_string(), "item already exists");
        assert_eq!(Error::NotFound.to_string(), "item does not exist");
    }
}
