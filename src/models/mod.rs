mod transaction;

pub use transaction::*;
