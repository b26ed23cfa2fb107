//! JWT codec and token service.

mod codec;
mod error;
mod service;

pub use codec::TokenCodec;
pub use error::TokenError;
pub use service::{extract_from_header, TokenService};
