use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The claim set carried by a signed stream URL (spec §4.13). Grounded on
/// `router.py`'s `/download` handler, which signs exactly this shape:
/// org, record, requesting user, owning connector, and the scopes the
/// caller was granted when the token was minted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedUrlClaims {
    pub org_id: Uuid,
    pub record_id: Uuid,
    pub user_id: Uuid,
    pub connector: String,
    pub scopes: Vec<String>,
    /// Unix timestamp (seconds) after which the token is rejected.
    pub exp: i64,
}
