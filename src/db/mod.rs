mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Ledger database pool
    pub db: DbPool,
    pub stripe: StripeClient,
    /// Stripe endpoint signing secret (whsec_...)
    pub webhook_secret: String,
    /// Maximum accepted age of a webhook signature timestamp, in seconds
    pub webhook_tolerance_secs: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
