use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::OrderId;

/// User-resolvable domain failures. Every variant is surfaced verbatim to the
/// conversation so the user can correct their input; none is retried.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentError {
    #[error("medication `{name}` is not in our inventory system")]
    UnknownMedication { name: String },
    #[error("no order found with id {id}")]
    UnknownOrder { id: OrderId },
    #[error("insufficient stock for `{name}`: requested {requested}, available {available}")]
    InsufficientStock { name: String, requested: u32, available: u32 },
    #[error("`{name}` requires a prescription reference to order")]
    PrescriptionRequired { name: String },
    #[error("prescription reference `{reference}` could not be verified")]
    InvalidPrescription { reference: String },
    #[error("prescription reference `{reference}` is not on record")]
    PrescriptionNotFound { reference: String },
    #[error("order quantity must be a positive number")]
    InvalidQuantity,
}

/// Failures leaving the fulfillment service. Domain errors pass through
/// verbatim; consistency failures are internal, fully rolled back, and never
/// shown to the user as a domain condition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] FulfillmentError),
    #[error("internal consistency failure: {0}")]
    Consistency(String),
}

impl ServiceError {
    /// Message safe to hand to the conversation layer.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(error) => error.to_string(),
            Self::Consistency(_) => {
                "Something went wrong on our side and the order was not placed. Please try again."
                    .to_string()
            }
        }
    }
}
