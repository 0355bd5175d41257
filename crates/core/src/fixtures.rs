//! Deterministic demo data for the CLI, smoke runs, and integration tests.

use crate::domain::medication::{Medication, MedicationName};
use crate::domain::monograph::DrugMonograph;
use crate::domain::prescription::{Prescription, PrescriptionRef};
use crate::fulfillment::FulfillmentService;

pub const PARACETAMOL: &str = "Paracetamol 500mg Tablets";
pub const AMOXICILLIN: &str = "Amoxicillin 250mg Capsules";
pub const IBUPROFEN: &str = "Ibuprofen 200mg Tablets";
pub const LISINOPRIL: &str = "Lisinopril 10mg Tablets";

pub const VALID_RX: &str = "RX12345";
pub const INVALID_RX: &str = "RX67890";

/// Summary of what was seeded, for operator output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub medications: usize,
    pub prescriptions: usize,
    pub monographs: usize,
}

/// Seeds the canonical demo pharmacy: four medications (one out of stock,
/// two prescription-only), three approved monographs, and one valid plus one
/// invalid prescription reference.
pub fn seed_demo_pharmacy(service: &FulfillmentService) -> SeedSummary {
    let medications = [
        (PARACETAMOL, 100, false),
        (AMOXICILLIN, 50, true),
        (IBUPROFEN, 0, false),
        (LISINOPRIL, 75, true),
    ];
    let monographs = [
        (
            PARACETAMOL,
            "For mild to moderate pain relief and fever reduction.",
            "Generally well-tolerated. Rare side effects include allergic reactions.",
            "Severe liver disease.",
            "Follow dosage instructions carefully.",
        ),
        (
            AMOXICILLIN,
            "Antibiotic for treating bacterial infections.",
            "Common: Nausea, rash, diarrhea. Seek medical attention for severe reactions.",
            "Known allergy to penicillin.",
            "Complete the full course as prescribed by your doctor.",
        ),
        (
            LISINOPRIL,
            "Treats high blood pressure and heart failure.",
            "Common: Dizziness, cough, headache. Report persistent side effects to your doctor.",
            "History of angioedema, pregnancy.",
            "Take as directed by your healthcare provider.",
        ),
    ];

    service.seed(|catalog, registry, shelf| {
        for (name, stock, requires_prescription) in medications {
            catalog.upsert(Medication {
                name: MedicationName::new(name),
                stock_quantity: stock,
                requires_prescription,
            });
        }
        for (name, usage, side_effects, contraindications, notes) in monographs {
            shelf.seed(DrugMonograph {
                medication: MedicationName::new(name),
                usage: usage.to_string(),
                side_effects: side_effects.to_string(),
                contraindications: contraindications.to_string(),
                notes: notes.to_string(),
            });
        }
        registry.seed(Prescription {
            reference: PrescriptionRef::new(VALID_RX),
            valid: true,
            associated_medication: Some(MedicationName::new(AMOXICILLIN)),
        });
        registry.seed(Prescription {
            reference: PrescriptionRef::new(INVALID_RX),
            valid: false,
            associated_medication: None,
        });
    });

    SeedSummary { medications: medications.len(), prescriptions: 2, monographs: monographs.len() }
}
