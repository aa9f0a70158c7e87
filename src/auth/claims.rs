use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid, // user ID
    pub iat: i64,  // issued at (unix timestamp)
    pub jti: Uuid, // token ID, reserved for revocation
}

impl Claims {
    pub fn subject(&self) -> Uuid {
        self.sub
    }
}
