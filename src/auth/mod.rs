//! Authentication Module
//!
//! Password digests, session tokens and the capability table that gates
//! every operation.

mod capabilities;
pub mod passwords;
mod tokens;

pub use capabilities::{
    authorize, authorize_principal, Capability, Operation, Principal, NOT_AUTHENTICATED,
};
pub use tokens::{Claims, TokenIssuer, TokenKind, TokenPair};
