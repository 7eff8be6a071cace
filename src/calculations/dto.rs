use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::calculations::model::{CalcKind, Calculation};

/// Request body for creating a calculation. `kind` stays a plain string here
/// so parsing failures surface as `UnknownKind` instead of a serde error.
#[derive(Debug, Deserialize)]
pub struct CalculationCreate {
    pub kind: String,
    pub inputs: Vec<f64>,
}

/// Request body for editing a calculation; both fields optional, omitted
/// fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct CalculationUpdate {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<f64>>,
}

/// Summary projection: the only outward representation of a calculation.
#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: CalcKind,
    pub inputs: Vec<f64>,
    pub result: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Calculation> for CalculationResponse {
    fn from(c: Calculation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            kind: c.kind,
            inputs: c.inputs,
            result: c.result,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_deserializes() {
        let body: CalculationCreate =
            serde_json::from_str(r#"{"kind": "addition", "inputs": [10.5, 3.0]}"#).unwrap();
        assert_eq!(body.kind, "addition");
        assert_eq!(body.inputs, vec![10.5, 3.0]);
    }

    #[test]
    fn update_body_allows_either_field_or_none() {
        let body: CalculationUpdate = serde_json::from_str(r#"{"inputs": [42.0, 7.0]}"#).unwrap();
        assert_eq!(body.kind, None);
        assert_eq!(body.inputs, Some(vec![42.0, 7.0]));

        let body: CalculationUpdate = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.kind.is_none() && body.inputs.is_none());
    }

    #[test]
    fn response_serializes_kind_lowercase() {
        let calc =
            Calculation::create("subtraction", vec![20.0, 5.0], Uuid::new_v4()).unwrap();
        let json = serde_json::to_value(CalculationResponse::from(calc)).unwrap();
        assert_eq!(json["kind"], "subtraction");
        assert_eq!(json["result"], 15.0);
    }
}
