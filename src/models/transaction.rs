use serde::{Deserialize, Serialize};

/// A completed payment recorded from a verified webhook.
///
/// Rows are written once, keyed by the processor's payment intent id, and
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub payment_intent_id: String,
    /// Amount in minor currency units (cents)
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: i64,
}

/// Data required to record a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub payment_intent_id: String,
    pub amount: i64,
    pub status: TransactionStatus,
}

/// Result of recording a transaction in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new row was inserted
    Recorded(Transaction),
    /// A row for this payment intent already exists; nothing was written
    AlreadyRecorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
