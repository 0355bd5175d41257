use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use remedy_core::{FulfillmentError, FulfillmentService, MedicationName, OrderId, PrescriptionRef};

/// One operation in the boundary contract. Inputs and outputs are plain JSON
/// so the collaborator runtime can call them regardless of transport.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool =
            self.tools.get(name).ok_or_else(|| anyhow!("no tool registered as `{name}`"))?;
        tool.execute(input).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registry with the full fulfillment surface registered.
    pub fn with_fulfillment(service: Arc<FulfillmentService>) -> Self {
        let mut registry = Self::default();
        registry.register(CheckStockTool { service: Arc::clone(&service) });
        registry.register(GetDrugInfoTool { service: Arc::clone(&service) });
        registry.register(VerifyPrescriptionTool { service: Arc::clone(&service) });
        registry.register(PlaceOrderTool { service: Arc::clone(&service) });
        registry.register(CheckOrderStatusTool { service });
        registry
    }
}

/// Domain failures are tool-level data, not transport failures: callers get
/// `{ "error": <kind>, "message": <verbatim text> }` and decide how to phrase
/// it to the user.
fn error_payload(error: &FulfillmentError) -> Value {
    let kind = match error {
        FulfillmentError::UnknownMedication { .. } => "unknown_medication",
        FulfillmentError::UnknownOrder { .. } => "unknown_order",
        FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
        FulfillmentError::PrescriptionRequired { .. } => "prescription_required",
        FulfillmentError::InvalidPrescription { .. } => "invalid_prescription",
        FulfillmentError::PrescriptionNotFound { .. } => "prescription_not_found",
        FulfillmentError::InvalidQuantity => "invalid_quantity",
    };
    json!({ "error": kind, "message": error.to_string() })
}

fn required_str(input: &Value, key: &str) -> Result<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing required string field `{key}`"))
}

struct CheckStockTool {
    service: Arc<FulfillmentService>,
}

#[async_trait]
impl Tool for CheckStockTool {
    fn name(&self) -> &'static str {
        "check_stock"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let name = MedicationName::new(required_str(&input, "medication_name")?);
        Ok(match self.service.check_stock(&name) {
            Ok(report) => json!({
                "medication_name": report.medication.as_str(),
                "in_stock": report.in_stock,
                "stock_quantity": report.stock_quantity,
                "requires_prescription": report.requires_prescription,
            }),
            Err(error) => error_payload(&error),
        })
    }
}

struct GetDrugInfoTool {
    service: Arc<FulfillmentService>,
}

#[async_trait]
impl Tool for GetDrugInfoTool {
    fn name(&self) -> &'static str {
        "get_drug_info"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let name = MedicationName::new(required_str(&input, "medication_name")?);
        Ok(match self.service.get_drug_info(&name) {
            Ok(monograph) => json!({
                "medication_name": monograph.medication.as_str(),
                "usage": monograph.usage,
                "side_effects": monograph.side_effects,
                "contraindications": monograph.contraindications,
                "notes": monograph.notes,
            }),
            Err(error) => error_payload(&error),
        })
    }
}

struct VerifyPrescriptionTool {
    service: Arc<FulfillmentService>,
}

#[async_trait]
impl Tool for VerifyPrescriptionTool {
    fn name(&self) -> &'static str {
        "verify_prescription"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let reference = PrescriptionRef::new(required_str(&input, "prescription_ref")?);
        use remedy_core::PrescriptionCheck::{Invalid, NotFound, Valid};
        Ok(match self.service.verify_prescription(&reference) {
            Valid => json!({ "valid": true, "prescription_ref": reference.normalized() }),
            Invalid => json!({ "valid": false, "prescription_ref": reference.normalized() }),
            NotFound => error_payload(&FulfillmentError::PrescriptionNotFound {
                reference: reference.normalized(),
            }),
        })
    }
}

struct PlaceOrderTool {
    service: Arc<FulfillmentService>,
}

#[async_trait]
impl Tool for PlaceOrderTool {
    fn name(&self) -> &'static str {
        "place_order"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let name = MedicationName::new(required_str(&input, "medication_name")?);
        let quantity = input
            .get("quantity")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("missing required integer field `quantity`"))?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| anyhow!("field `quantity` is out of range: {quantity}"))?;
        let reference = input
            .get("prescription_ref")
            .and_then(Value::as_str)
            .map(PrescriptionRef::new);

        Ok(match self.service.place_order(&name, quantity, reference.as_ref()) {
            Ok(order) => json!({
                "order_id": order.id.0,
                "order_ref": order.id.to_string(),
                "medication_name": order.medication.as_str(),
                "quantity": order.quantity,
                "status": order.status,
            }),
            Err(remedy_core::ServiceError::Domain(error)) => error_payload(&error),
            // Internal failures are rolled back and not described to callers.
            Err(error @ remedy_core::ServiceError::Consistency(_)) => {
                json!({ "error": "internal", "message": error.user_message() })
            }
        })
    }
}

struct CheckOrderStatusTool {
    service: Arc<FulfillmentService>,
}

#[async_trait]
impl Tool for CheckOrderStatusTool {
    fn name(&self) -> &'static str {
        "check_order_status"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let id = input
            .get("order_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("missing required integer field `order_id`"))?;
        Ok(match self.service.check_order_status(OrderId(id)) {
            Ok(order) => json!({
                "order_id": order.id.0,
                "medication_name": order.medication.as_str(),
                "quantity": order.quantity,
                "status": order.status,
            }),
            Err(error) => error_payload(&error),
        })
    }
}
