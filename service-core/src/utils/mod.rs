pub mod signature;

pub use signature::{generate_signature, verify_signature};
