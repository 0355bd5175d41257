use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use remedy_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NullAuditSink};
use remedy_core::{
    Arbitration, FulfillmentService, GuidelineArbiter, GuidelineKind, Journey, JourneyEffect,
    JourneyEngine, JourneyError, JourneyReply, JourneyType, PharmacyContact, TurnInput,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
struct Session {
    journey: Option<Journey>,
    /// Cleared by an emergency preemption: the suspended journey may then
    /// only be replaced, never resumed.
    resumable: bool,
    pending_interrupt: Option<GuidelineKind>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self { journey: None, resumable: true, pending_interrupt: None, last_activity: now }
    }
}

/// One conversational turn as the external intent layer hands it over: the
/// raw text for guideline arbitration plus whatever structured action the
/// intent layer extracted from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub text: String,
    pub action: TurnAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnAction {
    /// Begin (or replace) a journey of the given type.
    Start(JourneyType),
    /// Field input for the active journey.
    Input(TurnInput),
    /// Explicitly pick a suspended journey back up.
    Resume,
    /// Small talk or anything without an actionable intent.
    Chat,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// A guideline preempted the turn; the directive is the whole reply.
    Guideline { kind: GuidelineKind, directive: String },
    Journey(JourneyReply),
    /// Nothing to act on: no journey in flight and no journey requested.
    NoActiveJourney,
    /// The suspended journey followed an emergency and cannot be resumed.
    NotResumable,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Journey(#[from] JourneyError),
}

/// Owns one journey engine and one guideline arbiter per process and routes
/// each turn to the right session. Turns within a session are strictly
/// sequential; the sessions table is the only cross-session state here, and
/// the stores behind the fulfillment service synchronize themselves.
pub struct SessionCoordinator {
    engine: JourneyEngine,
    arbiter: GuidelineArbiter,
    // Each session carries its own lock; the map lock is only ever held long
    // enough to fetch or remove a slot, never across a turn.
    sessions: Mutex<HashMap<SessionId, Arc<Mutex<Session>>>>,
    session_timeout: Duration,
    sink: Arc<dyn AuditSink>,
}

impl SessionCoordinator {
    pub fn new(
        fulfillment: Arc<FulfillmentService>,
        contact: PharmacyContact,
        session_timeout_secs: u64,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            engine: JourneyEngine::new(fulfillment),
            arbiter: GuidelineArbiter::new(contact),
            sessions: Mutex::new(HashMap::new()),
            session_timeout: Duration::seconds(session_timeout_secs as i64),
            sink,
        }
    }

    pub fn with_defaults(fulfillment: Arc<FulfillmentService>) -> Self {
        Self::new(fulfillment, PharmacyContact::default(), 900, Arc::new(NullAuditSink))
    }

    pub fn start_session(&self) -> SessionId {
        let id = SessionId::new();
        self.lock_sessions().insert(id, Arc::new(Mutex::new(Session::new(Utc::now()))));
        info!(session = %id, "session started");
        self.sink.emit(AuditEvent::new(
            Some(id.to_string()),
            "session.started",
            AuditCategory::Session,
            AuditOutcome::Success,
        ));
        id
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Snapshot of the session's journey, mainly for tests and inspection.
    pub fn journey(&self, id: SessionId) -> Option<Journey> {
        let slot = self.lock_sessions().get(&id).cloned()?;
        let session = lock_session(&slot);
        session.journey.clone()
    }

    pub fn handle_turn(
        &self,
        id: SessionId,
        request: TurnRequest,
    ) -> Result<TurnOutcome, CoordinatorError> {
        let slot =
            self.lock_sessions().get(&id).cloned().ok_or(CoordinatorError::UnknownSession(id))?;
        // Turns within one session are sequential under the session's own
        // lock; other sessions' turns run in parallel against the stores.
        let mut guard = lock_session(&slot);
        let session = &mut *guard;
        session.last_activity = Utc::now();

        // Arbitration runs before the journey engine sees anything.
        if let Arbitration::Preempted { kind, effect, directive } =
            self.arbiter.arbitrate(&request.text)
        {
            match effect {
                JourneyEffect::SuspendTerminal => {
                    if let Some(journey) = session.journey.as_mut() {
                        if journey.is_active() {
                            journey.suspend();
                        }
                    }
                    session.resumable = false;
                    session.pending_interrupt = Some(kind);
                }
                JourneyEffect::SuspendResumable => {
                    if let Some(journey) = session.journey.as_mut() {
                        if journey.is_active() {
                            journey.suspend();
                        }
                    }
                    session.pending_interrupt = Some(kind);
                }
                JourneyEffect::None => {}
            }
            self.sink.emit(
                AuditEvent::new(
                    Some(id.to_string()),
                    "guideline.preempted",
                    AuditCategory::Guideline,
                    AuditOutcome::Success,
                )
                .with_metadata("kind", format!("{kind:?}")),
            );
            return Ok(TurnOutcome::Guideline { kind, directive });
        }

        match request.action {
            TurnAction::Start(journey_type) => {
                if let Some(existing) = session.journey.as_mut() {
                    self.engine.abort(existing);
                }
                let (journey, reply) = self.engine.begin(journey_type);
                session.journey = Some(journey);
                session.resumable = true;
                session.pending_interrupt = None;
                self.sink.emit(
                    AuditEvent::new(
                        Some(id.to_string()),
                        "journey.started",
                        AuditCategory::Journey,
                        AuditOutcome::Success,
                    )
                    .with_metadata("journey_type", format!("{journey_type:?}")),
                );
                Ok(TurnOutcome::Journey(reply))
            }
            TurnAction::Resume => match session.journey.as_mut() {
                Some(journey) if journey.suspended => {
                    if !session.resumable {
                        return Ok(TurnOutcome::NotResumable);
                    }
                    journey.resume();
                    session.pending_interrupt = None;
                    let reply = self.engine.reply_for_state(journey);
                    Ok(reply.map_or(TurnOutcome::NoActiveJourney, TurnOutcome::Journey))
                }
                Some(journey) if journey.is_active() => {
                    let reply = self.engine.reply_for_state(journey);
                    Ok(reply.map_or(TurnOutcome::NoActiveJourney, TurnOutcome::Journey))
                }
                _ => Ok(TurnOutcome::NoActiveJourney),
            },
            TurnAction::Input(input) => {
                let Some(journey) = session.journey.as_mut() else {
                    return Ok(TurnOutcome::NoActiveJourney);
                };
                if journey.suspended {
                    // Continuing the task counts as an explicit resume, but
                    // never past an emergency.
                    if !session.resumable {
                        return Ok(TurnOutcome::NotResumable);
                    }
                    info!(
                        session = %id,
                        interrupt = ?session.pending_interrupt,
                        "journey resumed by continuation"
                    );
                    journey.resume();
                    session.pending_interrupt = None;
                }
                if journey.state.is_terminal() {
                    return Ok(TurnOutcome::NoActiveJourney);
                }
                let from = journey.state;
                let reply = self.engine.advance(journey, input)?;
                if journey.state != from {
                    self.sink.emit(
                        AuditEvent::new(
                            Some(id.to_string()),
                            "journey.transition_applied",
                            AuditCategory::Journey,
                            AuditOutcome::Success,
                        )
                        .with_metadata("from", format!("{from:?}"))
                        .with_metadata("to", format!("{:?}", journey.state)),
                    );
                }
                Ok(TurnOutcome::Journey(reply))
            }
            TurnAction::Chat => match session.journey.as_ref() {
                Some(journey) if journey.is_active() => {
                    let reply = self.engine.reply_for_state(journey);
                    Ok(reply.map_or(TurnOutcome::NoActiveJourney, TurnOutcome::Journey))
                }
                _ => Ok(TurnOutcome::NoActiveJourney),
            },
        }
    }

    /// Explicit end-of-conversation signal.
    pub fn end_session(&self, id: SessionId) {
        self.close(id, "session.ended");
    }

    /// Externally triggered timeout for one session.
    pub fn timeout_session(&self, id: SessionId) {
        self.close(id, "session.timed_out");
    }

    /// Sweeps every session idle longer than the configured timeout and
    /// aborts whatever journey it still held. Returns how many were dropped.
    pub fn expire_idle_sessions(&self) -> usize {
        let cutoff = Utc::now() - self.session_timeout;
        let mut sessions = self.lock_sessions();
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, slot)| lock_session(slot).last_activity < cutoff)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            if let Some(slot) = sessions.remove(id) {
                let mut session = lock_session(&slot);
                if let Some(journey) = session.journey.as_mut() {
                    self.engine.abort(journey);
                }
                warn!(session = %id, "session expired while idle");
            }
        }
        expired.len()
    }

    fn close(&self, id: SessionId, event_type: &str) {
        let removed = self.lock_sessions().remove(&id);
        if let Some(slot) = removed {
            let mut session = lock_session(&slot);
            if let Some(journey) = session.journey.as_mut() {
                self.engine.abort(journey);
            }
            info!(session = %id, event = event_type, "session closed");
            self.sink.emit(AuditEvent::new(
                Some(id.to_string()),
                event_type,
                AuditCategory::Session,
                AuditOutcome::Success,
            ));
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Mutex<Session>>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn lock_session(slot: &Mutex<Session>) -> MutexGuard<'_, Session> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, Utc};

    use super::{SessionCoordinator, TurnAction, TurnOutcome, TurnRequest};
    use remedy_core::fixtures::{seed_demo_pharmacy, PARACETAMOL};
    use remedy_core::{
        FulfillmentService, GuidelineKind, JourneyReply, JourneyState, JourneyType, TurnInput,
    };

    fn coordinator() -> SessionCoordinator {
        let service = Arc::new(FulfillmentService::default());
        seed_demo_pharmacy(&service);
        SessionCoordinator::with_defaults(service)
    }

    fn input_turn(text: &str, input: TurnInput) -> TurnRequest {
        TurnRequest { text: text.to_string(), action: TurnAction::Input(input) }
    }

    #[test]
    fn unknown_session_is_rejected() {
        let coordinator = coordinator();
        let ghost = {
            let id = coordinator.start_session();
            coordinator.end_session(id);
            id
        };
        let result = coordinator.handle_turn(
            ghost,
            TurnRequest { text: "hi".into(), action: TurnAction::Chat },
        );
        assert!(result.is_err());
    }

    #[test]
    fn emergency_mid_journey_suspends_and_preserves_fields() {
        let coordinator = coordinator();
        let id = coordinator.start_session();

        coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "I need to order something".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("journey starts");
        coordinator
            .handle_turn(
                id,
                input_turn(
                    "Paracetamol please",
                    TurnInput::Medication("Paracetamol 500mg Tablets".into()),
                ),
            )
            .expect("medication collected");

        let fields_before = coordinator.journey(id).expect("journey").fields;

        let outcome = coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "actually I'm having trouble breathing".into(),
                    action: TurnAction::Chat,
                },
            )
            .expect("turn handled");
        assert!(matches!(
            outcome,
            TurnOutcome::Guideline { kind: GuidelineKind::Emergency, .. }
        ));

        let journey = coordinator.journey(id).expect("journey survives");
        assert!(journey.suspended);
        assert_eq!(journey.fields, fields_before);
    }

    #[test]
    fn emergency_suspension_cannot_be_resumed() {
        let coordinator = coordinator();
        let id = coordinator.start_session();

        coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "order".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("start");
        coordinator
            .handle_turn(
                id,
                TurnRequest { text: "I think this is an allergic reaction".into(), action: TurnAction::Chat },
            )
            .expect("emergency");

        let outcome = coordinator
            .handle_turn(id, TurnRequest { text: "ok, resume".into(), action: TurnAction::Resume })
            .expect("turn handled");
        assert_eq!(outcome, TurnOutcome::NotResumable);

        // A fresh journey may still be started explicitly.
        let outcome = coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "check an order for me".into(),
                    action: TurnAction::Start(JourneyType::OrderStatus),
                },
            )
            .expect("new journey");
        assert!(matches!(outcome, TurnOutcome::Journey(_)));
    }

    #[test]
    fn handoff_suspension_resumes_in_place() {
        let coordinator = coordinator();
        let id = coordinator.start_session();

        coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "order".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("start");
        coordinator
            .handle_turn(
                id,
                input_turn("paracetamol", TurnInput::Medication("Paracetamol 500mg Tablets".into())),
            )
            .expect("medication");

        let outcome = coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "can I speak to a pharmacist first?".into(),
                    action: TurnAction::Chat,
                },
            )
            .expect("handoff");
        assert!(matches!(
            outcome,
            TurnOutcome::Guideline { kind: GuidelineKind::HumanHandoff, .. }
        ));
        assert!(coordinator.journey(id).expect("journey").suspended);

        // Continuing the original task resumes without an explicit Resume.
        let outcome = coordinator
            .handle_turn(id, input_turn("two boxes", TurnInput::Quantity(2)))
            .expect("resumed input");
        assert!(matches!(outcome, TurnOutcome::Journey(_)));
        let journey = coordinator.journey(id).expect("journey");
        assert!(!journey.suspended);
        assert_eq!(journey.state, JourneyState::Confirming);
    }

    #[test]
    fn advice_boundary_leaves_the_journey_untouched() {
        let coordinator = coordinator();
        let id = coordinator.start_session();

        coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "order".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("start");

        let outcome = coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "should I take more than the label says?".into(),
                    action: TurnAction::Chat,
                },
            )
            .expect("boundary");
        assert!(matches!(
            outcome,
            TurnOutcome::Guideline { kind: GuidelineKind::MedicalAdviceBoundary, .. }
        ));

        let journey = coordinator.journey(id).expect("journey");
        assert!(!journey.suspended);
        assert_eq!(journey.state, JourneyState::CollectingMedication);
    }

    #[test]
    fn end_session_aborts_and_forgets() {
        let coordinator = coordinator();
        let id = coordinator.start_session();
        assert_eq!(coordinator.session_count(), 1);
        coordinator.end_session(id);
        assert_eq!(coordinator.session_count(), 0);
    }

    #[test]
    fn input_without_a_journey_has_nothing_to_do() {
        let coordinator = coordinator();
        let id = coordinator.start_session();
        let outcome = coordinator
            .handle_turn(id, input_turn("two", TurnInput::Quantity(2)))
            .expect("turn handled");
        assert_eq!(outcome, TurnOutcome::NoActiveJourney);
    }

    #[test]
    fn sessions_run_whole_journeys_in_parallel() {
        let coordinator = Arc::new(coordinator());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    let id = coordinator.start_session();
                    coordinator
                        .handle_turn(
                            id,
                            TurnRequest {
                                text: "order".into(),
                                action: TurnAction::Start(JourneyType::NewOrder),
                            },
                        )
                        .expect("start");
                    coordinator
                        .handle_turn(
                            id,
                            input_turn("paracetamol", TurnInput::Medication(PARACETAMOL.into())),
                        )
                        .expect("medication");
                    coordinator
                        .handle_turn(id, input_turn("one", TurnInput::Quantity(1)))
                        .expect("quantity");
                    matches!(
                        coordinator
                            .handle_turn(id, input_turn("yes", TurnInput::Affirm))
                            .expect("commit"),
                        TurnOutcome::Journey(JourneyReply::OrderPlaced(_))
                    )
                })
            })
            .collect();

        let placed = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(false))
            .filter(|ok| *ok)
            .count();
        assert_eq!(placed, 8);
        assert_eq!(coordinator.session_count(), 8);
    }

    #[test]
    fn timeout_aborts_the_journey_and_drops_the_session() {
        let coordinator = coordinator();
        let id = coordinator.start_session();
        coordinator
            .handle_turn(
                id,
                TurnRequest {
                    text: "order".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("start");

        coordinator.timeout_session(id);
        assert_eq!(coordinator.session_count(), 0);
        assert!(coordinator
            .handle_turn(id, TurnRequest { text: "hello?".into(), action: TurnAction::Chat })
            .is_err());
    }

    #[test]
    fn idle_sweep_aborts_only_stale_sessions() {
        let coordinator = coordinator();
        let stale = coordinator.start_session();
        let fresh = coordinator.start_session();
        coordinator
            .handle_turn(
                stale,
                TurnRequest {
                    text: "order".into(),
                    action: TurnAction::Start(JourneyType::NewOrder),
                },
            )
            .expect("start");

        let slot = coordinator
            .lock_sessions()
            .get(&stale)
            .cloned()
            .expect("stale session exists");
        slot.lock().expect("session lock").last_activity = Utc::now() - Duration::seconds(3600);

        assert_eq!(coordinator.expire_idle_sessions(), 1);
        assert_eq!(coordinator.session_count(), 1);
        assert_eq!(
            slot.lock().expect("session lock").journey.as_ref().map(|journey| journey.state),
            Some(JourneyState::Aborted)
        );
        assert!(coordinator
            .handle_turn(fresh, TurnRequest { text: "hi".into(), action: TurnAction::Chat })
            .is_ok());
    }
}
