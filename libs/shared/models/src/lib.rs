pub mod clinic;
pub mod error;

pub use clinic::*;
pub use error::*;
