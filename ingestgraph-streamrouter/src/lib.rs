//! Signed stream-URL issuance and validated dispatch (spec §4.13, C9).
//! `SignedUrlIssuer` mints the token a connector embeds in `get_signed_url`
//! responses that can't produce a native provider URL; `StreamRouter`
//! validates one on the way back in and hands the request to the owning
//! connector's `stream_record`.

mod claims;
mod issuer;
mod router;
mod secret;

pub use claims::SignedUrlClaims;
pub use issuer::{SignedUrlIssuer, SignedUrlRequest};
pub use router::{StreamRouteRegistry, StreamRouter};
pub use secret::{SecretProvider, StaticSecretProvider};
