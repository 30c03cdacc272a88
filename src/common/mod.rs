pub mod response;

pub use response::{ErrorEnvelope, ErrorRecord, ValidationError};
