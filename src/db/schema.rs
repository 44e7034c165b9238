use rusqlite::Connection;

/// Initialize the ledger schema. Safe to run on every startup.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Completed payments, one row per payment intent.
        -- payment_intent_id is the idempotency key for webhook redelivery.
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payment_intent_id TEXT NOT NULL UNIQUE,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'succeeded' CHECK (status IN ('succeeded')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at DESC, id DESC);
        "#,
    )
}
