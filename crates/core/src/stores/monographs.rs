use std::collections::HashMap;

use crate::domain::medication::MedicationName;
use crate::domain::monograph::DrugMonograph;

/// Shelf of pre-approved drug information records.
///
/// The record set is the content boundary for drug questions: if a record is
/// not on the shelf, the assistant has nothing to say about the medication.
#[derive(Debug, Default)]
pub struct MonographShelf {
    monographs: HashMap<String, DrugMonograph>,
}

impl MonographShelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, monograph: DrugMonograph) {
        self.monographs.insert(monograph.medication.normalized(), monograph);
    }

    pub fn get(&self, name: &MedicationName) -> Option<&DrugMonograph> {
        self.monographs.get(&name.normalized())
    }

    pub fn len(&self) -> usize {
        self.monographs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monographs.is_empty()
    }
}
