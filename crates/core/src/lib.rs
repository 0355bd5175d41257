pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod fulfillment;
pub mod guidelines;
pub mod journeys;
pub mod stores;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::medication::{Medication, MedicationName};
pub use domain::monograph::DrugMonograph;
pub use domain::order::{Order, OrderId, OrderStatus};
pub use domain::prescription::{Prescription, PrescriptionCheck, PrescriptionRef};
pub use errors::{FulfillmentError, ServiceError};
pub use fulfillment::{FulfillmentService, StockReport};
pub use guidelines::{
    Arbitration, GuidelineArbiter, GuidelineKind, JourneyEffect, PharmacyContact,
};
pub use journeys::{
    CollectedFields, Journey, JourneyEngine, JourneyError, JourneyField, JourneyReply,
    JourneyState, JourneyType, TurnInput,
};
