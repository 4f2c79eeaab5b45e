//! Credential validation

mod jwt;

pub use jwt::{Claims, JwtCredentialValidator, TokenType};
