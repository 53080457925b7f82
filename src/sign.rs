//! Request-signing schemes for outbound token exchanges.
//!
//! Two schemes cover the supported exchanges: HTTP message signing with a leaf
//! certificate's private key ([`certificate`]) and a static bearer-credential
//! header with an exchange-specific form body ([`bearer`]).

pub mod bearer;
pub mod certificate;

pub use bearer::*;
pub use certificate::*;
