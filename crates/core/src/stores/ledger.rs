use std::collections::BTreeMap;

use chrono::Utc;

use crate::domain::medication::MedicationName;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::prescription::PrescriptionRef;

/// Append-only record of placed orders.
///
/// Order ids come from a monotone counter, so ids are unique and strictly
/// increasing in placement order. Entries are never updated or removed by the
/// conversational core.
#[derive(Debug, Default)]
pub struct OrderLedger {
    next_id: u64,
    orders: BTreeMap<OrderId, Order>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new order with status `Placed`, or reports that the id space
    /// is exhausted so the caller can roll back its reservation.
    pub fn append(
        &mut self,
        medication: MedicationName,
        quantity: u32,
        prescription_ref: Option<PrescriptionRef>,
    ) -> Result<Order, LedgerExhausted> {
        let id = OrderId(self.next_id.checked_add(1).ok_or(LedgerExhausted)?);
        self.next_id = id.0;
        let order = Order {
            id,
            medication,
            quantity,
            prescription_ref,
            status: OrderStatus::Placed,
            placed_at: Utc::now(),
        };
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// The order id counter wrapped. Treated as an internal consistency failure
/// by the fulfillment service, never as a user-facing error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerExhausted;
