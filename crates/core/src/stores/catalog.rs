use std::collections::HashMap;

use crate::domain::medication::{Medication, MedicationName};

/// Why a reservation could not be taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReserveError {
    NotFound,
    InsufficientStock { available: u32 },
}

/// In-memory medication inventory keyed on the normalized medication name.
///
/// Mutation is exclusive (`&mut self`); cross-session atomicity of
/// reserve-then-append is provided by the fulfillment service, which is the
/// sole owner of this store.
#[derive(Debug, Default)]
pub struct Catalog {
    medications: HashMap<String, Medication>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a catalog entry.
    pub fn upsert(&mut self, medication: Medication) {
        self.medications.insert(medication.name.normalized(), medication);
    }

    /// Case-insensitive exact match.
    pub fn lookup(&self, name: &MedicationName) -> Option<&Medication> {
        self.medications.get(&name.normalized())
    }

    /// Checks `stock_quantity >= quantity` and decrements in a single step.
    pub fn reserve(&mut self, name: &MedicationName, quantity: u32) -> Result<(), ReserveError> {
        let medication =
            self.medications.get_mut(&name.normalized()).ok_or(ReserveError::NotFound)?;
        if medication.stock_quantity < quantity {
            return Err(ReserveError::InsufficientStock { available: medication.stock_quantity });
        }
        medication.stock_quantity -= quantity;
        Ok(())
    }

    /// Compensating credit for a reservation whose ledger commit failed.
    /// Only the fulfillment service's rollback path calls this.
    pub fn release(&mut self, name: &MedicationName, quantity: u32) {
        if let Some(medication) = self.medications.get_mut(&name.normalized()) {
            medication.stock_quantity = medication.stock_quantity.saturating_add(quantity);
        }
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }
}
