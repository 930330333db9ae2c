pub mod analysis;
pub mod error;
pub mod model;
pub mod session;

pub use error::{Error, Result};
