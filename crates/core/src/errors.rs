use thiserror::Error;

use crate::store::StoreError;

/// Service-level error taxonomy surfaced to callers of [`crate::CartService`].
///
/// `Validation` and `NotFound` are deterministic and never retried.
/// `Unavailable` is transient; retry policy belongs to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CartError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::CartNotFound(customer_id) => {
                Self::NotFound(format!("no shopping cart exists for customer {customer_id}"))
            }
            StoreError::Conflict => Self::Conflict(
                "cart was modified concurrently and retries were exhausted".to_string(),
            ),
            StoreError::Unavailable(message) => Self::Unavailable(message),
            StoreError::Decode(message) => Self::Unavailable(format!("decode error: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::cart::CustomerId;
    use crate::errors::CartError;
    use crate::store::StoreError;

    #[test]
    fn cart_not_found_maps_to_not_found() {
        let error = CartError::from(StoreError::CartNotFound(CustomerId(42)));
        assert!(matches!(error, CartError::NotFound(ref message) if message.contains("42")));
    }

    #[test]
    fn conflict_maps_to_conflict() {
        let error = CartError::from(StoreError::Conflict);
        assert!(matches!(error, CartError::Conflict(_)));
    }

    #[test]
    fn unavailable_and_decode_both_map_to_unavailable() {
        let unavailable = CartError::from(StoreError::Unavailable("pool timed out".to_string()));
        assert!(matches!(unavailable, CartError::Unavailable(_)));

        let decode = CartError::from(StoreError::Decode("bad timestamp".to_string()));
        assert!(matches!(decode, CartError::Unavailable(ref message) if message.contains("decode")));
    }
}
