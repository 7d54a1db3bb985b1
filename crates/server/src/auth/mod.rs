//! Account authentication: password hashing and signed session tokens.
//!
//! Session tokens are stateless HS256 JWTs keyed by `JWT_SECRET`; they are
//! orthogonal to the credential cipher and never carry brokerage secrets.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password, PasswordError};
pub use token::{TokenError, TokenService};
