use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::models::*;

use super::from_row::{TRANSACTION_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Transactions ============

/// Record a completed payment, keyed by its payment intent id.
///
/// Uses `ON CONFLICT DO NOTHING` so concurrent or repeated webhook deliveries
/// for the same intent are absorbed by the unique index: zero affected rows
/// means another delivery already recorded it.
pub fn record_transaction(conn: &Connection, input: &CreateTransaction) -> Result<RecordOutcome> {
    let created_at = now();

    let affected = conn.execute(
        "INSERT INTO transactions (payment_intent_id, amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(payment_intent_id) DO NOTHING",
        params![
            &input.payment_intent_id,
            input.amount,
            input.status.as_str(),
            created_at
        ],
    )?;

    if affected == 0 {
        return Ok(RecordOutcome::AlreadyRecorded);
    }

    Ok(RecordOutcome::Recorded(Transaction {
        id: conn.last_insert_rowid(),
        payment_intent_id: input.payment_intent_id.clone(),
        amount: input.amount,
        status: input.status,
        created_at,
    }))
}

/// All recorded transactions, newest first. Ties on `created_at` fall back
/// to insertion order (highest id first).
pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM transactions ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLS
        ),
        &[],
    )
}

pub fn get_transaction_by_intent(conn: &Connection, payment_intent_id: &str) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE payment_intent_id = ?1",
            TRANSACTION_COLS
        ),
        &[&payment_intent_id],
    )
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    Ok(count)
}
