//! Authentication adapters.
//!
//! - `jwt` - HS256 bearer token validation for the subscriber API

mod jwt;

pub use jwt::{AccessClaims, JwtSessionValidator};
