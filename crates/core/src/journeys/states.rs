use serde::{Deserialize, Serialize};

use crate::domain::medication::MedicationName;
use crate::domain::monograph::DrugMonograph;
use crate::domain::order::{Order, OrderId};
use crate::domain::prescription::PrescriptionRef;
use crate::errors::FulfillmentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyType {
    NewOrder,
    DrugInfo,
    OrderStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyState {
    Idle,
    CollectingMedication,
    CollectingQuantity,
    CollectingPrescription,
    CollectingOrderId,
    Confirming,
    Committing,
    Completed,
    Aborted,
}

impl JourneyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

/// The field a collection state is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyField {
    Medication,
    Quantity,
    Prescription,
    OrderId,
}

/// One turn's worth of structured input, extracted by the external intent
/// layer. The engine never parses free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnInput {
    Medication(String),
    Quantity(u32),
    PrescriptionRef(String),
    OrderId(u64),
    Affirm,
    Deny,
    Correct(JourneyField),
    Cancel,
}

/// Fields collected so far. Suspension keeps these intact, and a correction
/// reopens one state without clearing the others.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedFields {
    pub medication: Option<MedicationName>,
    pub requires_prescription: Option<bool>,
    pub quantity: Option<u32>,
    pub prescription_ref: Option<PrescriptionRef>,
    pub order_id: Option<OrderId>,
}

/// Serializable per-task state machine value. One per active task per
/// session; nothing about the journey lives on any call stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journey {
    pub journey_type: JourneyType,
    pub state: JourneyState,
    pub fields: CollectedFields,
    pub suspended: bool,
}

impl Journey {
    pub fn new(journey_type: JourneyType) -> Self {
        Self {
            journey_type,
            state: JourneyState::Idle,
            fields: CollectedFields::default(),
            suspended: false,
        }
    }

    /// Parks the journey without touching state or collected fields.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Re-enters the same state unchanged.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn is_active(&self) -> bool {
        !self.suspended && !self.state.is_terminal()
    }
}

/// Engine output for the collaborator runtime to phrase. The runtime owns
/// wording; the engine only names what happened or what is needed next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyReply {
    /// Ask the user for the named field.
    Prompt(JourneyField),
    /// Surface the order summary and ask for an explicit affirmative.
    Summary { medication: MedicationName, quantity: u32, prescription_ref: Option<PrescriptionRef> },
    OrderPlaced(Order),
    Info(DrugMonograph),
    Status(Order),
    /// Domain failure surfaced verbatim; whether the journey survived it is
    /// carried by the journey's own state.
    Failed(FulfillmentError),
    Cancelled,
}
