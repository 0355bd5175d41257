use crate::commands::CommandResult;
use remedy_core::config::{AppConfig, LoadOptions};
use remedy_core::fixtures::seed_demo_pharmacy;
use remedy_core::FulfillmentService;

/// Loads the demo pharmacy into a fresh in-memory service and verifies the
/// canonical inventory is queryable. The stores live for the process only, so
/// this doubles as a fixture sanity check.
pub fn run() -> CommandResult {
    if let Err(error) = AppConfig::load(LoadOptions::default()) {
        return CommandResult::failure(
            "seed",
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        );
    }

    let service = FulfillmentService::default();
    let summary = seed_demo_pharmacy(&service);

    let seeded = service.stock_level(&remedy_core::MedicationName::new(
        remedy_core::fixtures::PARACETAMOL,
    ));
    if seeded.is_none() {
        return CommandResult::failure(
            "seed",
            "seed_verification",
            "seeded catalog did not answer a stock query",
            5,
        );
    }

    CommandResult::success(
        "seed",
        format!(
            "demo pharmacy seeded: {} medications, {} prescriptions, {} monographs",
            summary.medications, summary.prescriptions, summary.monographs
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn seed_reports_the_canonical_counts() {
        let result = run();
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("4 medications"));
        assert!(result.output.contains("2 prescriptions"));
        assert!(result.output.contains("3 monographs"));
    }
}
