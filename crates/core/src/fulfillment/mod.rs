//! Atomic fulfillment operations over the catalog, registry, ledger, and
//! monograph shelf.
//!
//! The service is the only owner of the stores. All four live behind one
//! mutex, which is the sole synchronization point between concurrent
//! sessions; in particular the reserve-then-append pair inside
//! [`FulfillmentService::place_order`] executes under a single guard, so
//! stock can never be oversold and a reservation can never outlive the call
//! without a matching ledger entry.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NullAuditSink};
use crate::domain::medication::MedicationName;
use crate::domain::monograph::DrugMonograph;
use crate::domain::order::{Order, OrderId};
use crate::domain::prescription::{PrescriptionCheck, PrescriptionRef};
use crate::errors::{FulfillmentError, ServiceError};
use crate::stores::{Catalog, MonographShelf, OrderLedger, PrescriptionRegistry, ReserveError};

/// Answer to a stock enquiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    /// Canonical catalog spelling of the medication.
    pub medication: MedicationName,
    pub in_stock: bool,
    pub stock_quantity: u32,
    pub requires_prescription: bool,
}

#[derive(Debug, Default)]
struct Stores {
    catalog: Catalog,
    registry: PrescriptionRegistry,
    ledger: OrderLedger,
    monographs: MonographShelf,
}

pub struct FulfillmentService {
    stores: Mutex<Stores>,
    sink: Arc<dyn AuditSink>,
}

impl Default for FulfillmentService {
    fn default() -> Self {
        Self::new(Arc::new(NullAuditSink))
    }
}

impl FulfillmentService {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { stores: Mutex::new(Stores::default()), sink }
    }

    /// Seeds run before any session traffic; they share the same lock as the
    /// operations, so late seeding is still safe.
    pub fn seed<F>(&self, seed_fn: F)
    where
        F: FnOnce(&mut Catalog, &mut PrescriptionRegistry, &mut MonographShelf),
    {
        let mut stores = self.lock_stores();
        let stores = &mut *stores;
        seed_fn(&mut stores.catalog, &mut stores.registry, &mut stores.monographs);
    }

    pub fn check_stock(&self, name: &MedicationName) -> Result<StockReport, FulfillmentError> {
        let stores = self.lock_stores();
        let medication = stores.catalog.lookup(name).ok_or_else(|| {
            FulfillmentError::UnknownMedication { name: name.as_str().to_string() }
        })?;
        Ok(StockReport {
            medication: medication.name.clone(),
            in_stock: medication.stock_quantity > 0,
            stock_quantity: medication.stock_quantity,
            requires_prescription: medication.requires_prescription,
        })
    }

    pub fn get_drug_info(&self, name: &MedicationName) -> Result<DrugMonograph, FulfillmentError> {
        let stores = self.lock_stores();
        stores.monographs.get(name).cloned().ok_or_else(|| FulfillmentError::UnknownMedication {
            name: name.as_str().to_string(),
        })
    }

    pub fn verify_prescription(&self, reference: &PrescriptionRef) -> PrescriptionCheck {
        self.lock_stores().registry.verify(reference)
    }

    /// Places an order: lookup, prescription gate, reserve, append. The
    /// prescription is re-verified on every attempt; validity cached by an
    /// earlier conversational step is never trusted at commit time.
    pub fn place_order(
        &self,
        name: &MedicationName,
        quantity: u32,
        prescription_ref: Option<&PrescriptionRef>,
    ) -> Result<Order, ServiceError> {
        if quantity == 0 {
            return Err(FulfillmentError::InvalidQuantity.into());
        }

        let mut stores = self.lock_stores();

        let medication = stores.catalog.lookup(name).cloned().ok_or_else(|| {
            FulfillmentError::UnknownMedication { name: name.as_str().to_string() }
        })?;
        let canonical_name = medication.name.clone();

        if medication.requires_prescription {
            let reference = prescription_ref.ok_or_else(|| {
                FulfillmentError::PrescriptionRequired { name: canonical_name.as_str().to_string() }
            })?;
            if !stores.registry.verify(reference).is_valid() {
                return Err(FulfillmentError::InvalidPrescription {
                    reference: reference.normalized(),
                }
                .into());
            }
        } else if let Some(reference) = prescription_ref {
            warn!(
                medication = %canonical_name,
                reference = %reference,
                "prescription reference supplied for a non-prescription item"
            );
        }

        stores.catalog.reserve(&canonical_name, quantity).map_err(|error| match error {
            ReserveError::NotFound => {
                // Entry vanished between lookup and reserve under one guard.
                ServiceError::Consistency(format!(
                    "catalog entry for `{canonical_name}` disappeared mid-commit"
                ))
            }
            ReserveError::InsufficientStock { available } => {
                FulfillmentError::InsufficientStock {
                    name: canonical_name.as_str().to_string(),
                    requested: quantity,
                    available,
                }
                .into()
            }
        })?;

        let normalized_ref =
            prescription_ref.map(|reference| PrescriptionRef::new(reference.normalized()));
        let order = match stores.ledger.append(canonical_name.clone(), quantity, normalized_ref) {
            Ok(order) => order,
            Err(_) => {
                // Reservation without a ledger entry violates the core
                // invariant; undo the decrement before reporting.
                stores.catalog.release(&canonical_name, quantity);
                error!(
                    medication = %canonical_name,
                    quantity,
                    "ledger append failed after reservation; stock released"
                );
                self.sink.emit(
                    AuditEvent::new(
                        None,
                        "fulfillment.consistency_rollback",
                        AuditCategory::System,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("medication", canonical_name.as_str()),
                );
                return Err(ServiceError::Consistency(
                    "order ledger rejected the append; reservation rolled back".to_string(),
                ));
            }
        };

        info!(
            order_id = %order.id,
            medication = %order.medication,
            quantity = order.quantity,
            "order placed"
        );
        self.sink.emit(
            AuditEvent::new(
                None,
                "fulfillment.order_placed",
                AuditCategory::Fulfillment,
                AuditOutcome::Success,
            )
            .with_metadata("order_id", order.id.to_string())
            .with_metadata("medication", order.medication.as_str())
            .with_metadata("quantity", order.quantity.to_string()),
        );
        Ok(order)
    }

    pub fn check_order_status(&self, id: OrderId) -> Result<Order, FulfillmentError> {
        let stores = self.lock_stores();
        stores.ledger.get(id).cloned().ok_or(FulfillmentError::UnknownOrder { id })
    }

    /// Current stock count, for tests and operational checks.
    pub fn stock_level(&self, name: &MedicationName) -> Option<u32> {
        self.lock_stores().catalog.lookup(name).map(|medication| medication.stock_quantity)
    }

    pub fn order_count(&self) -> usize {
        self.lock_stores().ledger.len()
    }

    fn lock_stores(&self) -> MutexGuard<'_, Stores> {
        match self.stores.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
