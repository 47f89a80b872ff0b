pub mod context;
pub mod receipt;
pub mod transaction;

pub use context::*;
pub use receipt::*;
pub use transaction::*;
