use crate::wire::null_as_default;
use serde::{Deserialize, Serialize};

/// A user account as listed by the user service.
///
/// `enabled` is the only field the client changes, and only after the
/// backend confirmed the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// UUID assigned by the identity provider
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    pub enabled: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteUserRequest {
    pub email: String,
}

impl InviteUserRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wire_format() {
        let json = r#"{
            "id": "0f7e",
            "firstName": "Amina",
            "lastName": "Haddad",
            "username": "amina",
            "email": "amina@example.com",
            "enabled": true
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.enabled);
        assert_eq!(user.display_name(), "Amina Haddad");
    }

    #[test]
    fn test_invited_user_without_names() {
        let json = r#"{
            "id": "9a2c",
            "firstName": null,
            "lastName": null,
            "username": "li@example.com",
            "email": null,
            "enabled": true
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.first_name, "");
        assert_eq!(user.email, "");
        assert_eq!(user.display_name(), "li@example.com");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = User {
            id: "1".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            username: "svc-bot".to_string(),
            email: String::new(),
            enabled: false,
        };
        assert_eq!(user.display_name(), "svc-bot");
    }
}
