//! Per-turn safety arbitration.
//!
//! The rule table is totally ordered by priority. On every turn the arbiter
//! scans the rules from highest priority down and fires at most one; the rest
//! are not evaluated. Guideline hits are priority interrupts, not errors:
//! they carry a fixed directive and a statement of what happens to the active
//! journey.

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidelineKind {
    Emergency,
    HumanHandoff,
    MedicalAdviceBoundary,
}

/// What the session layer must do with the active journey when a rule fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyEffect {
    /// Suspend; no automatic resume. Only an explicitly started new journey
    /// may follow.
    SuspendTerminal,
    /// Suspend; the user may resume by continuing the task next turn.
    SuspendResumable,
    /// Leave the journey exactly where it is; this turn is answered by the
    /// directive alone.
    None,
}

#[derive(Clone, Debug)]
struct GuidelineRule {
    kind: GuidelineKind,
    priority: u8,
    phrases: &'static [&'static str],
    effect: JourneyEffect,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arbitration {
    Preempted { kind: GuidelineKind, effect: JourneyEffect, directive: String },
    PassThrough,
}

/// Pharmacy contact details surfaced by the handoff directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PharmacyContact {
    pub phone: String,
    pub hours: String,
}

impl Default for PharmacyContact {
    fn default() -> Self {
        Self {
            phone: "+1-800-PHARMA-1".to_string(),
            hours: "Monday to Friday 9 AM - 7 PM, Saturday 10 AM - 4 PM, closed Sundays"
                .to_string(),
        }
    }
}

const EMERGENCY_PHRASES: &[&str] = &[
    "severe pain",
    "trouble breathing",
    "difficulty breathing",
    "can't breathe",
    "allergic reaction",
    "chest pain",
    "feeling faint",
    "passed out",
    "overdose",
    "swelling of",
    "emergency",
];

const HANDOFF_PHRASES: &[&str] = &[
    "speak to a human",
    "talk to a human",
    "speak to a pharmacist",
    "talk to a pharmacist",
    "speak to someone",
    "real person",
    "human agent",
    "call the pharmacy",
];

const ADVICE_PHRASES: &[&str] = &[
    "what do i have",
    "diagnose",
    "diagnosis",
    "what is wrong with me",
    "should i take more",
    "should i take less",
    "increase my dose",
    "decrease my dose",
    "double my dose",
    "adjust my dose",
    "what should i take for",
    "which medicine should i",
    "recommend a treatment",
    "is it safe to combine",
    "interact with",
];

pub struct GuidelineArbiter {
    rules: Vec<GuidelineRule>,
    contact: PharmacyContact,
}

impl Default for GuidelineArbiter {
    fn default() -> Self {
        Self::new(PharmacyContact::default())
    }
}

impl GuidelineArbiter {
    pub fn new(contact: PharmacyContact) -> Self {
        let mut rules = vec![
            GuidelineRule {
                kind: GuidelineKind::Emergency,
                priority: 11,
                phrases: EMERGENCY_PHRASES,
                effect: JourneyEffect::SuspendTerminal,
            },
            GuidelineRule {
                kind: GuidelineKind::HumanHandoff,
                priority: 8,
                phrases: HANDOFF_PHRASES,
                effect: JourneyEffect::SuspendResumable,
            },
            GuidelineRule {
                kind: GuidelineKind::MedicalAdviceBoundary,
                priority: 7,
                phrases: ADVICE_PHRASES,
                effect: JourneyEffect::None,
            },
        ];
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules, contact }
    }

    /// Evaluates the rule table against one turn's text. Highest priority
    /// wins; evaluation short-circuits on the first match.
    pub fn arbitrate(&self, turn_text: &str) -> Arbitration {
        let normalized = turn_text.to_ascii_lowercase();
        for rule in &self.rules {
            if rule.phrases.iter().any(|phrase| normalized.contains(phrase)) {
                info!(kind = ?rule.kind, priority = rule.priority, "guideline fired");
                return Arbitration::Preempted {
                    kind: rule.kind,
                    effect: rule.effect,
                    directive: self.directive_for(rule.kind),
                };
            }
        }
        Arbitration::PassThrough
    }

    fn directive_for(&self, kind: GuidelineKind) -> String {
        match kind {
            GuidelineKind::Emergency => {
                "For symptoms like that, please contact emergency services or your doctor \
                 right away. I have paused what we were doing."
                    .to_string()
            }
            GuidelineKind::HumanHandoff => format!(
                "A human pharmacist can help you further. Call {} ({}). We can pick up where \
                 we left off whenever you are ready.",
                self.contact.phone, self.contact.hours
            ),
            GuidelineKind::MedicalAdviceBoundary => format!(
                "I cannot provide medical advice, diagnoses, or dosage recommendations. \
                 Please consult your doctor or pharmacist at {}.",
                self.contact.phone
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Arbitration, GuidelineArbiter, GuidelineKind, JourneyEffect};

    #[test]
    fn emergency_outranks_handoff_in_the_same_turn() {
        let arbiter = GuidelineArbiter::default();
        let arbitration = arbiter
            .arbitrate("I have trouble breathing, please let me speak to a pharmacist");
        match arbitration {
            Arbitration::Preempted { kind, effect, .. } => {
                assert_eq!(kind, GuidelineKind::Emergency);
                assert_eq!(effect, JourneyEffect::SuspendTerminal);
            }
            Arbitration::PassThrough => panic!("expected a preemption"),
        }
    }

    #[test]
    fn handoff_request_is_resumable() {
        let arbiter = GuidelineArbiter::default();
        match arbiter.arbitrate("Can I talk to a human instead?") {
            Arbitration::Preempted { kind, effect, directive } => {
                assert_eq!(kind, GuidelineKind::HumanHandoff);
                assert_eq!(effect, JourneyEffect::SuspendResumable);
                assert!(directive.contains("+1-800-PHARMA-1"));
            }
            Arbitration::PassThrough => panic!("expected a preemption"),
        }
    }

    #[test]
    fn advice_boundary_fires_without_touching_the_journey() {
        let arbiter = GuidelineArbiter::default();
        match arbiter.arbitrate("Should I take more of my Lisinopril?") {
            Arbitration::Preempted { kind, effect, .. } => {
                assert_eq!(kind, GuidelineKind::MedicalAdviceBoundary);
                assert_eq!(effect, JourneyEffect::None);
            }
            Arbitration::PassThrough => panic!("expected a preemption"),
        }
    }

    #[test]
    fn ordinary_order_talk_passes_through() {
        let arbiter = GuidelineArbiter::default();
        assert_eq!(
            arbiter.arbitrate("I'd like 2 boxes of Paracetamol 500mg Tablets"),
            Arbitration::PassThrough
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let arbiter = GuidelineArbiter::default();
        assert!(matches!(
            arbiter.arbitrate("SEVERE PAIN in my chest"),
            Arbitration::Preempted { kind: GuidelineKind::Emergency, .. }
        ));
    }
}
