use serde::{Deserialize, Serialize};

use crate::pii::Masked;

/// Local mirror of an identity-provider account. The id is the provider's
/// own subject id, so webhook payloads can address records directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Masked<String>,
    pub image_url: Option<String>,
}
