use std::collections::HashMap;

use crate::domain::prescription::{Prescription, PrescriptionCheck, PrescriptionRef};

/// Read-only registry of prescription validity records, keyed on the
/// normalized (uppercase) reference. Records are immutable after seeding.
#[derive(Debug, Default)]
pub struct PrescriptionRegistry {
    prescriptions: HashMap<String, Prescription>,
}

impl PrescriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, prescription: Prescription) {
        self.prescriptions.insert(prescription.reference.normalized(), prescription);
    }

    /// Pure lookup, no mutation.
    pub fn verify(&self, reference: &PrescriptionRef) -> PrescriptionCheck {
        match self.prescriptions.get(&reference.normalized()) {
            Some(record) if record.valid => PrescriptionCheck::Valid,
            Some(_) => PrescriptionCheck::Invalid,
            None => PrescriptionCheck::NotFound,
        }
    }

    pub fn len(&self) -> usize {
        self.prescriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prescriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::PrescriptionRegistry;
    use crate::domain::prescription::{Prescription, PrescriptionCheck, PrescriptionRef};

    fn registry() -> PrescriptionRegistry {
        let mut registry = PrescriptionRegistry::new();
        registry.seed(Prescription {
            reference: PrescriptionRef::new("RX12345"),
            valid: true,
            associated_medication: None,
        });
        registry.seed(Prescription {
            reference: PrescriptionRef::new("RX67890"),
            valid: false,
            associated_medication: None,
        });
        registry
    }

    #[test]
    fn verify_matches_reference_case_insensitively() {
        assert_eq!(
            registry().verify(&PrescriptionRef::new("rx12345")),
            PrescriptionCheck::Valid
        );
    }

    #[test]
    fn invalid_and_missing_records_are_distinguished() {
        let registry = registry();
        assert_eq!(registry.verify(&PrescriptionRef::new("RX67890")), PrescriptionCheck::Invalid);
        assert_eq!(registry.verify(&PrescriptionRef::new("RX00000")), PrescriptionCheck::NotFound);
    }
}
