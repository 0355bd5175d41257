//! Owned in-memory stores behind the fulfillment service.
//!
//! Each store exposes only the atomic operations the service composes;
//! nothing else in the system holds a reference to them. Swapping any of them
//! for durable storage changes no caller.

pub mod catalog;
pub mod ledger;
pub mod monographs;
pub mod registry;

pub use catalog::{Catalog, ReserveError};
pub use ledger::{LedgerExhausted, OrderLedger};
pub use monographs::MonographShelf;
pub use registry::PrescriptionRegistry;
