pub mod compare;
pub mod error;
pub mod naming;
pub mod report;

pub use error::JmkitError;
