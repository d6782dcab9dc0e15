//! Errors surfaced by the order core.
//!
//! Every operation returns [`OrderError`]. The variants mirror what a caller
//! can act on; storage details stay inside [`OrderError::Repository`].

use core::fmt;

use stitchworks_core::{CustomerId, DesignId, OrderId, OrderStatus, VariantId};
use thiserror::Error;

use crate::db::RepositoryError;

/// Entity referenced by a [`OrderError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Variant(VariantId),
    Design(DesignId),
    Order(OrderId),
    Customer(CustomerId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variant(id) => write!(f, "variant {id}"),
            Self::Design(id) => write!(f, "design {id}"),
            Self::Order(id) => write!(f, "order {id}"),
            Self::Customer(id) => write!(f, "customer {id}"),
        }
    }
}

/// Errors returned by order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Requested quantity exceeds the variant's stock.
    #[error(
        "insufficient stock for variant {variant_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        requested: i32,
        available: i32,
    },

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(Resource),

    /// The requested status is not reachable from the current one.
    #[error("cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The caller may not perform this mutation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Lock contention exceeded the configured bound. Safe to retry.
    #[error("resource busy, retry later")]
    Busy,

    /// The request was rejected before reaching storage.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl OrderError {
    /// Units missing for an [`OrderError::InsufficientStock`], zero otherwise.
    #[must_use]
    pub const fn shortfall(&self) -> i32 {
        match self {
            Self::InsufficientStock {
                requested,
                available,
                ..
            } => requested.saturating_sub(*available),
            _ => 0,
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockTimeout => Self::Busy,
            other => Self::Repository(other),
        }
    }
}
