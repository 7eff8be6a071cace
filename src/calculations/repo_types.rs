use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::calculations::model::{CalcError, CalcKind, Calculation};

/// Calculation row as stored. `kind` is TEXT in the database and parsed back
/// into the closed enum on read.
#[derive(Debug, Clone, FromRow)]
pub struct CalculationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub inputs: Vec<f64>,
    pub result: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<CalculationRow> for Calculation {
    type Error = CalcError;

    fn try_from(row: CalculationRow) -> Result<Self, Self::Error> {
        Ok(Calculation {
            id: row.id,
            user_id: row.user_id,
            kind: CalcKind::parse(&row.kind)?,
            inputs: row.inputs,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
