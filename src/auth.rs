//! Credential-domain models: security tokens, session key pairs, and subject
//! credentials.

pub mod session;
pub mod subject;
pub mod token;

pub use session::*;
pub use subject::*;
pub use token::*;
