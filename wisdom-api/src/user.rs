use uuid::Uuid;

use crate::{Error, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

/// Profile of a user, as synced from the identity provider
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
}

impl User {
    /// Name shown next to content authored by users that never synced a profile
    pub const ANONYMOUS: &'static str = "Anonymous";

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.name)?;
        crate::validate_string(&self.email)?;
        if let Some(url) = &self.image_url {
            crate::validate_string(url)?;
        }
        Ok(())
    }
}
