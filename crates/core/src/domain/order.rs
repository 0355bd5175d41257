use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::medication::MedicationName;
use crate::domain::prescription::PrescriptionRef;

/// Strictly increasing order identifier assigned by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ORD-{:06}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Processing,
    Shipped,
    Cancelled,
}

/// A placed order. Created exactly once by a successful placement; the
/// conversational core never advances its status afterwards (that belongs to
/// the external fulfillment process).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub medication: MedicationName,
    pub quantity: u32,
    pub prescription_ref: Option<PrescriptionRef>,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}
