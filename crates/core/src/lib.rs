// crates/core/src/lib.rs
pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod paths;
pub mod store;
pub mod types;
pub mod validate;

pub use catalog::*;
pub use error::*;
pub use fingerprint::*;
pub use store::*;
pub use types::*;
pub use validate::*;
