use std::sync::Arc;
use std::time::Instant;

use crate::commands::CommandResult;
use remedy_agent::{SessionCoordinator, TurnAction, TurnOutcome, TurnRequest};
use remedy_core::audit::NullAuditSink;
use remedy_core::config::{AppConfig, LoadOptions};
use remedy_core::fixtures::{seed_demo_pharmacy, AMOXICILLIN, VALID_RX};
use remedy_core::{
    FulfillmentService, GuidelineKind, JourneyReply, JourneyType, MedicationName, TurnInput,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// End-to-end readiness: config, fixtures, a scripted prescription order
/// conversation, and one guideline preemption.
pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config_started = Instant::now();
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms: config_started.elapsed().as_millis() as u64,
                message: error.to_string(),
            });
            checks.push(skipped("fixture_seed"));
            checks.push(skipped("guided_order"));
            checks.push(skipped("guideline_arbitration"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let seed_started = Instant::now();
    let service = Arc::new(FulfillmentService::default());
    let summary = seed_demo_pharmacy(&service);
    checks.push(SmokeCheck {
        name: "fixture_seed",
        status: SmokeStatus::Pass,
        elapsed_ms: seed_started.elapsed().as_millis() as u64,
        message: format!("seeded {} medications", summary.medications),
    });

    let coordinator = SessionCoordinator::new(
        Arc::clone(&service),
        config.contact(),
        config.session.timeout_secs,
        Arc::new(NullAuditSink),
    );

    let order_started = Instant::now();
    match scripted_order(&coordinator, &service) {
        Ok(message) => checks.push(SmokeCheck {
            name: "guided_order",
            status: SmokeStatus::Pass,
            elapsed_ms: order_started.elapsed().as_millis() as u64,
            message,
        }),
        Err(message) => {
            checks.push(SmokeCheck {
                name: "guided_order",
                status: SmokeStatus::Fail,
                elapsed_ms: order_started.elapsed().as_millis() as u64,
                message,
            });
            checks.push(skipped("guideline_arbitration"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    }

    let guideline_started = Instant::now();
    let session = coordinator.start_session();
    let outcome = coordinator.handle_turn(
        session,
        TurnRequest { text: "I am having trouble breathing".to_string(), action: TurnAction::Chat },
    );
    match outcome {
        Ok(TurnOutcome::Guideline { kind: GuidelineKind::Emergency, .. }) => {
            checks.push(SmokeCheck {
                name: "guideline_arbitration",
                status: SmokeStatus::Pass,
                elapsed_ms: guideline_started.elapsed().as_millis() as u64,
                message: "emergency phrase preempted the turn".to_string(),
            });
        }
        other => checks.push(SmokeCheck {
            name: "guideline_arbitration",
            status: SmokeStatus::Fail,
            elapsed_ms: guideline_started.elapsed().as_millis() as u64,
            message: format!("expected an emergency preemption, got {other:?}"),
        }),
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Runs the canonical conversation: order two packs of a prescription
/// medication with a valid reference, then read the order back.
fn scripted_order(
    coordinator: &SessionCoordinator,
    service: &FulfillmentService,
) -> Result<String, String> {
    let session = coordinator.start_session();
    let script = [
        ("start an order", TurnAction::Start(JourneyType::NewOrder)),
        (AMOXICILLIN, TurnAction::Input(TurnInput::Medication(AMOXICILLIN.to_string()))),
        ("two packs", TurnAction::Input(TurnInput::Quantity(2))),
        (VALID_RX, TurnAction::Input(TurnInput::PrescriptionRef(VALID_RX.to_string()))),
    ];

    for (text, action) in script {
        let outcome = coordinator
            .handle_turn(session, TurnRequest { text: text.to_string(), action })
            .map_err(|error| format!("turn `{text}` failed: {error}"))?;
        if let TurnOutcome::Journey(JourneyReply::Failed(error)) = outcome {
            return Err(format!("turn `{text}` was rejected: {error}"));
        }
    }

    let outcome = coordinator
        .handle_turn(
            session,
            TurnRequest { text: "yes".to_string(), action: TurnAction::Input(TurnInput::Affirm) },
        )
        .map_err(|error| format!("confirmation failed: {error}"))?;
    let order = match outcome {
        TurnOutcome::Journey(JourneyReply::OrderPlaced(order)) => order,
        other => return Err(format!("expected a placed order, got {other:?}")),
    };

    let stock = service.stock_level(&MedicationName::new(AMOXICILLIN));
    if stock != Some(48) {
        return Err(format!("expected stock 48 after the order, found {stock:?}"));
    }
    Ok(format!("placed {} for quantity {}", order.id, order.quantity))
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
