use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::domain::medication::MedicationName;
use crate::domain::prescription::{PrescriptionCheck, PrescriptionRef};
use crate::errors::{FulfillmentError, ServiceError};
use crate::fulfillment::FulfillmentService;
use crate::journeys::states::{
    Journey, JourneyField, JourneyReply, JourneyState, JourneyType, TurnInput,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JourneyError {
    #[error("journey is suspended; resume it before advancing")]
    Suspended,
    #[error("journey already finished in state {state:?}")]
    Finished { state: JourneyState },
    #[error("input {input:?} is not accepted in state {state:?}")]
    UnexpectedInput { state: JourneyState, input: TurnInput },
    #[error("internal failure during commit: {0}")]
    Internal(String),
}

/// Drives one journey to completion, invoking fulfillment operations as each
/// state's required field arrives. Validation failures that the user can fix
/// keep the journey in place; commit failures abort it.
pub struct JourneyEngine {
    fulfillment: Arc<FulfillmentService>,
}

impl JourneyEngine {
    pub fn new(fulfillment: Arc<FulfillmentService>) -> Self {
        Self { fulfillment }
    }

    pub fn fulfillment(&self) -> &Arc<FulfillmentService> {
        &self.fulfillment
    }

    /// Starts a journey of the given type, returning it together with the
    /// first prompt.
    pub fn begin(&self, journey_type: JourneyType) -> (Journey, JourneyReply) {
        let mut journey = Journey::new(journey_type);
        let reply = match journey_type {
            JourneyType::NewOrder | JourneyType::DrugInfo => {
                journey.state = JourneyState::CollectingMedication;
                JourneyReply::Prompt(JourneyField::Medication)
            }
            JourneyType::OrderStatus => {
                journey.state = JourneyState::CollectingOrderId;
                JourneyReply::Prompt(JourneyField::OrderId)
            }
        };
        (journey, reply)
    }

    /// The reply that re-enters the journey's current state, used after a
    /// resume to repeat whatever was pending before suspension.
    pub fn reply_for_state(&self, journey: &Journey) -> Option<JourneyReply> {
        match journey.state {
            JourneyState::CollectingMedication => {
                Some(JourneyReply::Prompt(JourneyField::Medication))
            }
            JourneyState::CollectingQuantity => Some(JourneyReply::Prompt(JourneyField::Quantity)),
            JourneyState::CollectingPrescription => {
                Some(JourneyReply::Prompt(JourneyField::Prescription))
            }
            JourneyState::CollectingOrderId => Some(JourneyReply::Prompt(JourneyField::OrderId)),
            JourneyState::Confirming => self.summary_reply(journey),
            _ => None,
        }
    }

    /// Forces the journey into `Aborted` (cancellation, session end, timeout).
    pub fn abort(&self, journey: &mut Journey) {
        if !journey.state.is_terminal() {
            journey.state = JourneyState::Aborted;
        }
    }

    /// Consumes one turn's structured input.
    pub fn advance(
        &self,
        journey: &mut Journey,
        input: TurnInput,
    ) -> Result<JourneyReply, JourneyError> {
        if journey.suspended {
            return Err(JourneyError::Suspended);
        }
        if journey.state.is_terminal() {
            return Err(JourneyError::Finished { state: journey.state });
        }

        if input == TurnInput::Cancel {
            journey.state = JourneyState::Aborted;
            return Ok(JourneyReply::Cancelled);
        }

        let from = journey.state;
        let reply = match journey.journey_type {
            JourneyType::NewOrder => self.advance_new_order(journey, input)?,
            JourneyType::DrugInfo => self.advance_drug_info(journey, input)?,
            JourneyType::OrderStatus => self.advance_order_status(journey, input)?,
        };
        if journey.state != from {
            info!(
                journey_type = ?journey.journey_type,
                from = ?from,
                to = ?journey.state,
                "journey transition"
            );
        }
        Ok(reply)
    }

    fn advance_new_order(
        &self,
        journey: &mut Journey,
        input: TurnInput,
    ) -> Result<JourneyReply, JourneyError> {
        match (journey.state, input) {
            (JourneyState::CollectingMedication, TurnInput::Medication(name)) => {
                let name = MedicationName::new(name);
                let report = match self.fulfillment.check_stock(&name) {
                    Ok(report) => report,
                    // Misspellings are correctable; stay in place.
                    Err(error) => return Ok(JourneyReply::Failed(error)),
                };
                if !report.in_stock {
                    journey.state = JourneyState::Aborted;
                    return Ok(JourneyReply::Failed(FulfillmentError::InsufficientStock {
                        name: report.medication.as_str().to_string(),
                        requested: 1,
                        available: 0,
                    }));
                }
                journey.fields.medication = Some(report.medication);
                journey.fields.requires_prescription = Some(report.requires_prescription);
                Ok(self.continue_order(journey))
            }
            (JourneyState::CollectingQuantity, TurnInput::Quantity(quantity)) => {
                if quantity == 0 {
                    return Ok(JourneyReply::Failed(FulfillmentError::InvalidQuantity));
                }
                journey.fields.quantity = Some(quantity);
                Ok(self.continue_order(journey))
            }
            (JourneyState::CollectingPrescription, TurnInput::PrescriptionRef(reference)) => {
                let reference = PrescriptionRef::new(reference);
                match self.fulfillment.verify_prescription(&reference) {
                    PrescriptionCheck::Valid => {
                        journey.fields.prescription_ref =
                            Some(PrescriptionRef::new(reference.normalized()));
                        Ok(self.continue_order(journey))
                    }
                    PrescriptionCheck::Invalid => {
                        Ok(JourneyReply::Failed(FulfillmentError::InvalidPrescription {
                            reference: reference.normalized(),
                        }))
                    }
                    PrescriptionCheck::NotFound => {
                        Ok(JourneyReply::Failed(FulfillmentError::PrescriptionNotFound {
                            reference: reference.normalized(),
                        }))
                    }
                }
            }
            (JourneyState::Confirming, TurnInput::Affirm) => self.commit_order(journey),
            // A plain negative reopens collection from the top; validated
            // fields stay so the user only restates what changes.
            (JourneyState::Confirming, TurnInput::Deny) => {
                journey.fields.medication = None;
                journey.state = JourneyState::CollectingMedication;
                Ok(JourneyReply::Prompt(JourneyField::Medication))
            }
            (JourneyState::Confirming, TurnInput::Correct(field)) => {
                self.reopen_field(journey, field)
            }
            (state, input) => Err(JourneyError::UnexpectedInput { state, input }),
        }
    }

    /// Routes to the next missing field, or to confirmation once everything
    /// required has been collected. `CollectingPrescription` is entered only
    /// when the stock check reported a prescription requirement.
    fn continue_order(&self, journey: &mut Journey) -> JourneyReply {
        let fields = &journey.fields;
        if fields.medication.is_none() {
            journey.state = JourneyState::CollectingMedication;
            return JourneyReply::Prompt(JourneyField::Medication);
        }
        if fields.quantity.is_none() {
            journey.state = JourneyState::CollectingQuantity;
            return JourneyReply::Prompt(JourneyField::Quantity);
        }
        if fields.requires_prescription == Some(true) && fields.prescription_ref.is_none() {
            journey.state = JourneyState::CollectingPrescription;
            return JourneyReply::Prompt(JourneyField::Prescription);
        }
        journey.state = JourneyState::Confirming;
        self.summary_reply(journey).unwrap_or(JourneyReply::Prompt(JourneyField::Medication))
    }

    fn reopen_field(
        &self,
        journey: &mut Journey,
        field: JourneyField,
    ) -> Result<JourneyReply, JourneyError> {
        match field {
            JourneyField::Medication => {
                journey.fields.medication = None;
                journey.fields.requires_prescription = None;
            }
            JourneyField::Quantity => journey.fields.quantity = None,
            JourneyField::Prescription if journey.fields.requires_prescription == Some(true) => {
                journey.fields.prescription_ref = None;
            }
            _ => {
                return Err(JourneyError::UnexpectedInput {
                    state: journey.state,
                    input: TurnInput::Correct(field),
                });
            }
        }
        Ok(self.continue_order(journey))
    }

    fn commit_order(&self, journey: &mut Journey) -> Result<JourneyReply, JourneyError> {
        journey.state = JourneyState::Committing;
        let (Some(medication), Some(quantity)) =
            (journey.fields.medication.clone(), journey.fields.quantity)
        else {
            // Confirming without collected fields cannot happen through the
            // transition table.
            journey.state = JourneyState::Aborted;
            return Err(JourneyError::Internal(
                "confirmation reached without medication and quantity".to_string(),
            ));
        };

        // The prescription is re-verified inside place_order; validity cached
        // during collection is not trusted at commit time.
        match self.fulfillment.place_order(
            &medication,
            quantity,
            journey.fields.prescription_ref.as_ref(),
        ) {
            Ok(order) => {
                journey.fields.order_id = Some(order.id);
                journey.state = JourneyState::Completed;
                Ok(JourneyReply::OrderPlaced(order))
            }
            Err(ServiceError::Domain(error)) => {
                journey.state = JourneyState::Aborted;
                Ok(JourneyReply::Failed(error))
            }
            Err(ServiceError::Consistency(message)) => {
                journey.state = JourneyState::Aborted;
                Err(JourneyError::Internal(message))
            }
        }
    }

    fn advance_drug_info(
        &self,
        journey: &mut Journey,
        input: TurnInput,
    ) -> Result<JourneyReply, JourneyError> {
        match (journey.state, input) {
            (JourneyState::CollectingMedication, TurnInput::Medication(name)) => {
                journey.state = JourneyState::Completed;
                match self.fulfillment.get_drug_info(&MedicationName::new(name)) {
                    Ok(monograph) => Ok(JourneyReply::Info(monograph)),
                    Err(error) => Ok(JourneyReply::Failed(error)),
                }
            }
            (state, input) => Err(JourneyError::UnexpectedInput { state, input }),
        }
    }

    fn advance_order_status(
        &self,
        journey: &mut Journey,
        input: TurnInput,
    ) -> Result<JourneyReply, JourneyError> {
        match (journey.state, input) {
            (JourneyState::CollectingOrderId, TurnInput::OrderId(id)) => {
                journey.state = JourneyState::Completed;
                match self.fulfillment.check_order_status(crate::domain::order::OrderId(id)) {
                    Ok(order) => Ok(JourneyReply::Status(order)),
                    Err(error) => Ok(JourneyReply::Failed(error)),
                }
            }
            (state, input) => Err(JourneyError::UnexpectedInput { state, input }),
        }
    }

    fn summary_reply(&self, journey: &Journey) -> Option<JourneyReply> {
        Some(JourneyReply::Summary {
            medication: journey.fields.medication.clone()?,
            quantity: journey.fields.quantity?,
            prescription_ref: journey.fields.prescription_ref.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{JourneyEngine, JourneyError};
    use crate::domain::medication::{Medication, MedicationName};
    use crate::domain::prescription::{Prescription, PrescriptionRef};
    use crate::errors::FulfillmentError;
    use crate::fulfillment::FulfillmentService;
    use crate::journeys::states::{
        JourneyField, JourneyReply, JourneyState, JourneyType, TurnInput,
    };

    fn engine() -> JourneyEngine {
        let service = FulfillmentService::default();
        service.seed(|catalog, registry, monographs| {
            catalog.upsert(Medication {
                name: MedicationName::new("Paracetamol 500mg Tablets"),
                stock_quantity: 100,
                requires_prescription: false,
            });
            catalog.upsert(Medication {
                name: MedicationName::new("Amoxicillin 250mg Capsules"),
                stock_quantity: 5,
                requires_prescription: true,
            });
            catalog.upsert(Medication {
                name: MedicationName::new("Ibuprofen 200mg Tablets"),
                stock_quantity: 0,
                requires_prescription: false,
            });
            registry.seed(Prescription {
                reference: PrescriptionRef::new("RX100"),
                valid: true,
                associated_medication: Some(MedicationName::new("Amoxicillin 250mg Capsules")),
            });
            registry.seed(Prescription {
                reference: PrescriptionRef::new("RX67890"),
                valid: false,
                associated_medication: None,
            });
            monographs.seed(crate::domain::monograph::DrugMonograph {
                medication: MedicationName::new("Paracetamol 500mg Tablets"),
                usage: "For mild to moderate pain relief and fever reduction.".to_string(),
                side_effects: "Generally well-tolerated.".to_string(),
                contraindications: "Severe liver disease.".to_string(),
                notes: "Follow dosage instructions carefully.".to_string(),
            });
        });
        JourneyEngine::new(Arc::new(service))
    }

    #[test]
    fn otc_order_skips_prescription_collection() {
        let engine = engine();
        let (mut journey, reply) = engine.begin(JourneyType::NewOrder);
        assert_eq!(reply, JourneyReply::Prompt(JourneyField::Medication));

        let reply = engine
            .advance(&mut journey, TurnInput::Medication("paracetamol 500mg tablets".into()))
            .expect("medication accepted");
        assert_eq!(reply, JourneyReply::Prompt(JourneyField::Quantity));
        assert_eq!(journey.state, JourneyState::CollectingQuantity);

        let reply = engine.advance(&mut journey, TurnInput::Quantity(3)).expect("quantity");
        assert!(matches!(reply, JourneyReply::Summary { quantity: 3, .. }));
        assert_eq!(journey.state, JourneyState::Confirming);

        let reply = engine.advance(&mut journey, TurnInput::Affirm).expect("commit");
        let order = match reply {
            JourneyReply::OrderPlaced(order) => order,
            other => panic!("expected placed order, got {other:?}"),
        };
        assert_eq!(journey.state, JourneyState::Completed);
        assert_eq!(journey.fields.order_id, Some(order.id));
        assert_eq!(
            engine
                .fulfillment()
                .stock_level(&MedicationName::new("Paracetamol 500mg Tablets")),
            Some(97)
        );
    }

    #[test]
    fn prescription_medication_requires_valid_reference_before_confirming() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        engine
            .advance(&mut journey, TurnInput::Medication("Amoxicillin 250mg Capsules".into()))
            .expect("medication");
        engine.advance(&mut journey, TurnInput::Quantity(2)).expect("quantity");
        assert_eq!(journey.state, JourneyState::CollectingPrescription);

        let reply = engine
            .advance(&mut journey, TurnInput::PrescriptionRef("RX67890".into()))
            .expect("turn processed");
        assert!(matches!(
            reply,
            JourneyReply::Failed(FulfillmentError::InvalidPrescription { .. })
        ));
        assert_eq!(journey.state, JourneyState::CollectingPrescription);

        let reply = engine
            .advance(&mut journey, TurnInput::PrescriptionRef("rx100".into()))
            .expect("valid reference");
        assert!(matches!(reply, JourneyReply::Summary { .. }));
        assert_eq!(journey.state, JourneyState::Confirming);

        let reply = engine.advance(&mut journey, TurnInput::Affirm).expect("commit");
        assert!(matches!(reply, JourneyReply::OrderPlaced(_)));
    }

    #[test]
    fn unknown_medication_keeps_collection_open() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        let reply = engine
            .advance(&mut journey, TurnInput::Medication("Nonexistol".into()))
            .expect("turn processed");
        assert!(matches!(
            reply,
            JourneyReply::Failed(FulfillmentError::UnknownMedication { .. })
        ));
        assert_eq!(journey.state, JourneyState::CollectingMedication);
    }

    #[test]
    fn out_of_stock_medication_aborts_the_journey() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        let reply = engine
            .advance(&mut journey, TurnInput::Medication("Ibuprofen 200mg Tablets".into()))
            .expect("turn processed");
        assert!(matches!(
            reply,
            JourneyReply::Failed(FulfillmentError::InsufficientStock { .. })
        ));
        assert_eq!(journey.state, JourneyState::Aborted);
    }

    #[test]
    fn correction_reopens_one_field_and_keeps_the_rest() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        engine
            .advance(&mut journey, TurnInput::Medication("Paracetamol 500mg Tablets".into()))
            .expect("medication");
        engine.advance(&mut journey, TurnInput::Quantity(2)).expect("quantity");

        let reply = engine
            .advance(&mut journey, TurnInput::Correct(JourneyField::Quantity))
            .expect("reopen quantity");
        assert_eq!(reply, JourneyReply::Prompt(JourneyField::Quantity));
        assert_eq!(journey.state, JourneyState::CollectingQuantity);
        assert!(journey.fields.medication.is_some());

        let reply = engine.advance(&mut journey, TurnInput::Quantity(5)).expect("new quantity");
        assert!(matches!(reply, JourneyReply::Summary { quantity: 5, .. }));
    }

    #[test]
    fn commit_failure_aborts_and_surfaces_the_error_kind() {
        let engine = engine();
        let name = MedicationName::new("Amoxicillin 250mg Capsules");
        let reference = PrescriptionRef::new("RX100");

        // Drain stock so the commit's reservation fails.
        engine.fulfillment().place_order(&name, 2, Some(&reference)).expect("first");
        engine.fulfillment().place_order(&name, 2, Some(&reference)).expect("second");

        let (mut journey, _) = engine.begin(JourneyType::NewOrder);
        engine
            .advance(&mut journey, TurnInput::Medication("Amoxicillin 250mg Capsules".into()))
            .expect("medication");
        engine.advance(&mut journey, TurnInput::Quantity(2)).expect("quantity");
        engine
            .advance(&mut journey, TurnInput::PrescriptionRef("RX100".into()))
            .expect("reference");

        let reply = engine.advance(&mut journey, TurnInput::Affirm).expect("turn processed");
        assert!(matches!(
            reply,
            JourneyReply::Failed(FulfillmentError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(journey.state, JourneyState::Aborted);
    }

    #[test]
    fn prescription_validity_is_rechecked_at_commit() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        engine
            .advance(&mut journey, TurnInput::Medication("Amoxicillin 250mg Capsules".into()))
            .expect("medication");
        engine.advance(&mut journey, TurnInput::Quantity(1)).expect("quantity");
        engine
            .advance(&mut journey, TurnInput::PrescriptionRef("RX100".into()))
            .expect("reference valid at collection time");

        // The reference is withdrawn between collection and confirmation.
        engine.fulfillment().seed(|_, registry, _| {
            registry.seed(Prescription {
                reference: PrescriptionRef::new("RX100"),
                valid: false,
                associated_medication: None,
            });
        });

        let reply = engine.advance(&mut journey, TurnInput::Affirm).expect("turn processed");
        assert!(matches!(
            reply,
            JourneyReply::Failed(FulfillmentError::InvalidPrescription { .. })
        ));
        assert_eq!(journey.state, JourneyState::Aborted);
    }

    #[test]
    fn suspension_preserves_fields_and_blocks_advancement() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);
        engine
            .advance(&mut journey, TurnInput::Medication("Paracetamol 500mg Tablets".into()))
            .expect("medication");

        let fields_before = journey.fields.clone();
        journey.suspend();
        assert!(journey.suspended);
        assert_eq!(journey.fields, fields_before);

        let error = engine
            .advance(&mut journey, TurnInput::Quantity(2))
            .expect_err("suspended journeys take no input");
        assert_eq!(error, JourneyError::Suspended);

        journey.resume();
        assert_eq!(journey.state, JourneyState::CollectingQuantity);
        assert_eq!(
            engine.reply_for_state(&journey),
            Some(JourneyReply::Prompt(JourneyField::Quantity))
        );
    }

    #[test]
    fn drug_info_journey_is_single_step() {
        let engine = engine();
        let (mut journey, reply) = engine.begin(JourneyType::DrugInfo);
        assert_eq!(reply, JourneyReply::Prompt(JourneyField::Medication));

        let reply = engine
            .advance(&mut journey, TurnInput::Medication("paracetamol 500mg tablets".into()))
            .expect("monograph");
        assert!(matches!(reply, JourneyReply::Info(_)));
        assert_eq!(journey.state, JourneyState::Completed);
    }

    #[test]
    fn order_status_journey_reports_unknown_order_and_completes() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::OrderStatus);

        let reply =
            engine.advance(&mut journey, TurnInput::OrderId(999)).expect("turn processed");
        assert!(matches!(reply, JourneyReply::Failed(FulfillmentError::UnknownOrder { .. })));
        assert_eq!(journey.state, JourneyState::Completed);
    }

    #[test]
    fn cancel_aborts_from_any_collection_state() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);
        let reply = engine.advance(&mut journey, TurnInput::Cancel).expect("cancel");
        assert_eq!(reply, JourneyReply::Cancelled);
        assert_eq!(journey.state, JourneyState::Aborted);
    }

    #[test]
    fn unexpected_input_is_rejected_without_state_change() {
        let engine = engine();
        let (mut journey, _) = engine.begin(JourneyType::NewOrder);

        let error = engine
            .advance(&mut journey, TurnInput::Quantity(2))
            .expect_err("quantity before medication");
        assert!(matches!(error, JourneyError::UnexpectedInput { .. }));
        assert_eq!(journey.state, JourneyState::CollectingMedication);
    }
}
