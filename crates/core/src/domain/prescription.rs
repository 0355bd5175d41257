use serde::{Deserialize, Serialize};

use crate::domain::medication::MedicationName;

/// Opaque prescription reference number. References are matched
/// case-insensitively; the canonical form is uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrescriptionRef(pub String);

impl PrescriptionRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn normalized(&self) -> String {
        self.0.trim().to_ascii_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrescriptionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrescriptionRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Registry record for a single prescription reference. Immutable after
/// seeding; the conversational core only ever reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub reference: PrescriptionRef,
    pub valid: bool,
    pub associated_medication: Option<MedicationName>,
}

/// Outcome of a registry lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionCheck {
    Valid,
    Invalid,
    NotFound,
}

impl PrescriptionCheck {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}
