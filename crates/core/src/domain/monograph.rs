use serde::{Deserialize, Serialize};

use crate::domain::medication::MedicationName;

/// Pre-approved informational record for a medication.
///
/// This is the only source the assistant may quote drug information from.
/// Diagnostic or dosage-adjustment advice is excluded at the data level: the
/// record set is seeded exclusively from approved text and the core never
/// composes new medical content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugMonograph {
    pub medication: MedicationName,
    pub usage: String,
    pub side_effects: String,
    pub contraindications: String,
    pub notes: String,
}
