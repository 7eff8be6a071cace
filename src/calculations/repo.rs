use sqlx::PgPool;
use uuid::Uuid;

use crate::calculations::model::{CalcError, Calculation};
use crate::calculations::repo_types::CalculationRow;

/// Persists an already-validated calculation under its pre-assigned id.
pub async fn insert(db: &PgPool, calc: &Calculation) -> Result<(), CalcError> {
    sqlx::query(
        r#"
        INSERT INTO calculations (id, user_id, kind, inputs, result, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(calc.id)
    .bind(calc.user_id)
    .bind(calc.kind.as_str())
    .bind(&calc.inputs)
    .bind(calc.result)
    .bind(calc.created_at)
    .bind(calc.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Browse: the owner's calculations in insertion order.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Calculation>, CalcError> {
    let rows = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, kind, inputs, result, created_at, updated_at
        FROM calculations
        WHERE user_id = $1
        ORDER BY created_at ASC, id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Calculation::try_from).collect()
}

/// A missing row and an owner mismatch are the same `NotFound`.
pub async fn get(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<Calculation, CalcError> {
    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, kind, inputs, result, created_at, updated_at
        FROM calculations
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(CalcError::NotFound)?;

    Calculation::try_from(row)
}

/// Edit in a transaction: lock the row, merge the new fields through the
/// entity so the result is recomputed, write back. Nothing is visible until
/// commit.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    kind: Option<&str>,
    inputs: Option<Vec<f64>>,
) -> Result<Calculation, CalcError> {
    let mut tx = db.begin().await?;

    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, kind, inputs, result, created_at, updated_at
        FROM calculations
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(CalcError::NotFound)?;

    let mut calc = Calculation::try_from(row)?;
    calc.edit(kind, inputs)?;

    sqlx::query(
        r#"
        UPDATE calculations
        SET kind = $1, inputs = $2, result = $3, updated_at = $4
        WHERE id = $5
        "#,
    )
    .bind(calc.kind.as_str())
    .bind(&calc.inputs)
    .bind(calc.result)
    .bind(calc.updated_at)
    .bind(calc.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(calc)
}

/// Deleting an absent (or foreign) id fails `NotFound`, on repeat too.
pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), CalcError> {
    let res = sqlx::query("DELETE FROM calculations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    if res.rows_affected() == 0 {
        return Err(CalcError::NotFound);
    }
    Ok(())
}
