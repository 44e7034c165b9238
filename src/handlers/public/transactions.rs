use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::Transaction;

pub async fn list_transactions(State(state): State<AppState>) -> Result<Json<Vec<Transaction>>> {
    let conn = state.db.get()?;
    let transactions = queries::list_transactions(&conn)?;
    Ok(Json(transactions))
}
