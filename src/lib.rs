//! paydesk - Stripe payment intents and a webhook-fed transaction ledger
//!
//! The storefront creates payment intents through this service, completes
//! payment with Stripe directly, and Stripe reports the outcome back through
//! a signed webhook that lands in a SQLite ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
