//! Endpoints of the authenticated user: profile, emails, SSH keys.

use serde::{Deserialize, Serialize};

use super::{ApiError, BuddyClient};

/// The authenticated user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    pub avatar_url: String,
}

/// Body of a profile update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    /// Display name.
    pub name: String,
}

/// An email address attached to the authenticated user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileEmail {
    /// Email address.
    pub email: String,
    /// Whether the address was confirmed.
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct ProfileEmailList {
    #[serde(default)]
    emails: Vec<ProfileEmail>,
}

#[derive(Debug, Serialize)]
struct EmailCreate<'a> {
    email: &'a str,
}

/// An SSH public key of the authenticated user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicKey {
    /// Service identifier.
    pub id: i64,
    /// API URL.
    pub url: String,
    /// Link to the web UI.
    pub html_url: String,
    /// Key title.
    pub title: String,
    /// Public key in OpenSSH format.
    pub content: String,
}

/// Body of a public key upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicKeyCreate {
    /// Public key in OpenSSH format.
    pub content: String,
    /// Key title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BuddyClient {
    /// The authenticated user.
    pub async fn get_profile(&self) -> Result<Profile, ApiError> {
        self.get("/user").await
    }

    /// Update the authenticated user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        self.patch("/user", update).await
    }

    /// Email addresses of the authenticated user.
    pub async fn list_profile_emails(&self) -> Result<Vec<ProfileEmail>, ApiError> {
        let list: ProfileEmailList = self.get("/user/emails").await?;
        Ok(list.emails)
    }

    /// Add an email address; the Service sends a confirmation mail.
    pub async fn add_profile_email(&self, email: &str) -> Result<ProfileEmail, ApiError> {
        self.post("/user/emails", &EmailCreate { email }).await
    }

    /// Remove an email address from the profile.
    pub async fn delete_profile_email(&self, email: &str) -> Result<(), ApiError> {
        self.delete(&format!("/user/emails/{email}")).await
    }

    /// Create a public key.
    pub async fn create_public_key(&self, key: &PublicKeyCreate) -> Result<PublicKey, ApiError> {
        self.post("/user/keys", key).await
    }

    /// Fetch a public key.
    pub async fn get_public_key(&self, key_id: i64) -> Result<PublicKey, ApiError> {
        self.get(&format!("/user/keys/{key_id}")).await
    }

    /// Delete a public key.
    pub async fn delete_public_key(&self, key_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/user/keys/{key_id}")).await
    }
}
