use serde::{Deserialize, Serialize};

/// Account role as recorded on the user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Buyer account; the only role allowed to purchase courses
    Client,
    /// Course author with access to pricing
    Admin,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
}

impl UserProfile {
    pub fn can_purchase(&self) -> bool {
        self.role == UserRole::Client
    }

    pub fn can_manage_courses(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_cannot_purchase_or_manage() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":"u-1","role":"moderator"}"#).unwrap();
        assert_eq!(profile.role, UserRole::Unknown);
        assert!(!profile.can_purchase());
        assert!(!profile.can_manage_courses());
    }

    #[test]
    fn client_role_can_purchase() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id":"u-2","email":"a@b.io","role":"client"}"#).unwrap();
        assert!(profile.can_purchase());
    }
}
