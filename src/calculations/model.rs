use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Everything a calculation request can fail with. Owner mismatch and a
/// missing row are deliberately the same `NotFound` so callers cannot probe
/// for other users' records.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("inputs must contain at least two numbers")]
    InvalidInputs,
    #[error("unknown calculation kind: {0}")]
    UnknownKind(String),
    #[error("cannot divide by zero")]
    DivisionByZero,
    #[error("calculation not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl CalcError {
    pub fn status(&self) -> StatusCode {
        match self {
            CalcError::InvalidInputs | CalcError::UnknownKind(_) | CalcError::DivisionByZero => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CalcError::NotFound => StatusCode::NOT_FOUND,
            CalcError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The four supported operations. Closed set: a new kind means a new variant
/// here plus one arm in `evaluate`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl CalcKind {
    /// Parses the wire label, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, CalcError> {
        match s.to_ascii_lowercase().as_str() {
            "addition" => Ok(CalcKind::Addition),
            "subtraction" => Ok(CalcKind::Subtraction),
            "multiplication" => Ok(CalcKind::Multiplication),
            "division" => Ok(CalcKind::Division),
            other => Err(CalcError::UnknownKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalcKind::Addition => "addition",
            CalcKind::Subtraction => "subtraction",
            CalcKind::Multiplication => "multiplication",
            CalcKind::Division => "division",
        }
    }
}

/// Pure dispatch over the operation set. Division checks its divisors before
/// touching the arithmetic, so a zero never reaches the fold.
pub fn evaluate(kind: CalcKind, inputs: &[f64]) -> Result<f64, CalcError> {
    if inputs.len() < 2 {
        return Err(CalcError::InvalidInputs);
    }
    match kind {
        CalcKind::Addition => Ok(inputs.iter().sum()),
        CalcKind::Subtraction => Ok(inputs[1..].iter().fold(inputs[0], |acc, x| acc - x)),
        CalcKind::Multiplication => Ok(inputs.iter().product()),
        CalcKind::Division => {
            if inputs[1..].iter().any(|x| *x == 0.0) {
                return Err(CalcError::DivisionByZero);
            }
            Ok(inputs[1..].iter().fold(inputs[0], |acc, x| acc / x))
        }
    }
}

/// One calculation owned by a user. `result` is always derived from
/// `(kind, inputs)`; every mutation goes back through `evaluate`.
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: CalcKind,
    pub inputs: Vec<f64>,
    pub result: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Calculation {
    pub fn create(kind: &str, inputs: Vec<f64>, user_id: Uuid) -> Result<Self, CalcError> {
        let kind = CalcKind::parse(kind)?;
        let result = evaluate(kind, &inputs)?;
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            inputs,
            result,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces kind and/or inputs, keeping whichever is not supplied.
    /// Validates and recomputes before mutating, so a failed edit leaves
    /// the calculation untouched.
    pub fn edit(&mut self, kind: Option<&str>, inputs: Option<Vec<f64>>) -> Result<(), CalcError> {
        let kind = match kind {
            Some(s) => CalcKind::parse(s)?,
            None => self.kind,
        };
        let inputs = inputs.unwrap_or_else(|| self.inputs.clone());
        let result = evaluate(kind, &inputs)?;

        self.kind = kind;
        self.inputs = inputs;
        self.result = result;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_sums_all_inputs() {
        let calc = Calculation::create("addition", vec![10.5, 3.0, 2.0], Uuid::new_v4()).unwrap();
        assert_eq!(calc.result, 15.5);
    }

    #[test]
    fn subtraction_folds_left() {
        let calc = Calculation::create("subtraction", vec![10.0, 3.0, 2.0], Uuid::new_v4()).unwrap();
        assert_eq!(calc.result, 5.0);
    }

    #[test]
    fn multiplication_multiplies() {
        let calc = Calculation::create("multiplication", vec![5.0, 4.0], Uuid::new_v4()).unwrap();
        assert_eq!(calc.result, 20.0);
    }

    #[test]
    fn division_folds_left() {
        let calc = Calculation::create("division", vec![20.0, 4.0, 5.0], Uuid::new_v4()).unwrap();
        assert_eq!(calc.result, 1.0);
    }

    #[test]
    fn division_by_zero_is_rejected() {
        let err = Calculation::create("division", vec![10.0, 0.0], Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero));
    }

    #[test]
    fn zero_divisor_anywhere_past_first_is_rejected() {
        let err = evaluate(CalcKind::Division, &[10.0, 2.0, 0.0, 5.0]).unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero));
    }

    #[test]
    fn zero_as_dividend_is_fine() {
        assert_eq!(evaluate(CalcKind::Division, &[0.0, 4.0]).unwrap(), 0.0);
    }

    #[test]
    fn fewer_than_two_inputs_is_rejected_for_every_kind() {
        for kind in ["addition", "subtraction", "multiplication", "division"] {
            let err = Calculation::create(kind, vec![25.0], Uuid::new_v4()).unwrap_err();
            assert!(matches!(err, CalcError::InvalidInputs), "kind: {kind}");
            let err = Calculation::create(kind, vec![], Uuid::new_v4()).unwrap_err();
            assert!(matches!(err, CalcError::InvalidInputs), "kind: {kind}");
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Calculation::create("square_root", vec![25.0, 1.0], Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CalcError::UnknownKind(_)));
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!(
            CalcKind::parse("MULTIPLICATION").unwrap(),
            CalcKind::Multiplication
        );
        assert_eq!(CalcKind::parse("Division").unwrap(), CalcKind::Division);
    }

    #[test]
    fn evaluate_is_deterministic() {
        let inputs = [3.5, 1.25, 0.5];
        for kind in [
            CalcKind::Addition,
            CalcKind::Subtraction,
            CalcKind::Multiplication,
            CalcKind::Division,
        ] {
            let a = evaluate(kind, &inputs).unwrap();
            let b = evaluate(kind, &inputs).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn edit_with_inputs_only_keeps_kind_and_identity() {
        let mut calc = Calculation::create("addition", vec![1.0, 2.0], Uuid::new_v4()).unwrap();
        let (id, owner, created_at) = (calc.id, calc.user_id, calc.created_at);

        calc.edit(None, Some(vec![7.0, 3.0])).unwrap();

        assert_eq!(calc.kind, CalcKind::Addition);
        assert_eq!(calc.result, 10.0);
        assert_eq!(calc.id, id);
        assert_eq!(calc.user_id, owner);
        assert_eq!(calc.created_at, created_at);
    }

    #[test]
    fn edit_can_change_kind_and_inputs_together() {
        let mut calc = Calculation::create("addition", vec![1.0, 2.0], Uuid::new_v4()).unwrap();
        let (id, created_at) = (calc.id, calc.created_at);

        calc.edit(Some("multiplication"), Some(vec![5.0, 4.0]))
            .unwrap();

        assert_eq!(calc.kind, CalcKind::Multiplication);
        assert_eq!(calc.result, 20.0);
        assert_eq!(calc.id, id);
        assert_eq!(calc.created_at, created_at);
        assert!(calc.updated_at >= created_at);
    }

    #[test]
    fn failed_edit_leaves_the_calculation_untouched() {
        let mut calc = Calculation::create("addition", vec![1.0, 2.0], Uuid::new_v4()).unwrap();
        let before = calc.clone();

        let err = calc.edit(Some("division"), Some(vec![9.0, 0.0])).unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero));

        assert_eq!(calc.kind, before.kind);
        assert_eq!(calc.inputs, before.inputs);
        assert_eq!(calc.result, before.result);
        assert_eq!(calc.updated_at, before.updated_at);
    }

    #[test]
    fn error_statuses_are_stable() {
        assert_eq!(
            CalcError::InvalidInputs.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CalcError::UnknownKind("modulus".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            CalcError::DivisionByZero.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(CalcError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}
