use serde::{Deserialize, Serialize};

/// Display name of a medication. Identity is case-insensitive: two names that
/// differ only in ASCII case refer to the same catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MedicationName(pub String);

impl MedicationName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Normalized lookup key shared by every store keyed on medication name.
    pub fn normalized(&self) -> String {
        self.0.trim().to_ascii_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MedicationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MedicationName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: MedicationName,
    pub stock_quantity: u32,
    pub requires_prescription: bool,
}

#[cfg(test)]
mod tests {
    use super::MedicationName;

    #[test]
    fn normalization_folds_case_and_whitespace() {
        let a = MedicationName::new("  Amoxicillin 250mg Capsules ");
        let b = MedicationName::new("amoxicillin 250MG capsules");
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn display_preserves_original_spelling() {
        let name = MedicationName::new("Paracetamol 500mg Tablets");
        assert_eq!(name.to_string(), "Paracetamol 500mg Tablets");
    }
}
