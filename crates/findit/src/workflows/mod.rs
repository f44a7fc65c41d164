pub mod claims;
mod error;

pub use error::WorkflowError;
