pub mod domain;
pub mod error;
pub mod pricing;
pub mod slots;

pub use domain::*;
pub use error::CoreError;
