//! User records and the `ManageUser` endpoint params.

use serde::{Deserialize, Serialize};

/// Role of a user within the application.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Member,
    Admin,
}

/// The private view of a user, as resolved from a bearer token.
///
/// # Example
///
/// ```json
/// {
///   "userId": "0192f0c4-5c1e-7a9b-8d3e-2f1a0b9c8d7e",
///   "email": "ada@example.com",
///   "fullName": "Ada",
///   "role": "member",
///   "createdAt": "2026-01-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default)]
    pub role: UserRole,

    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl User {
    /// The fields safe to show to other users.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: self.user_id.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: UserRole,
}

/// Params of the `user` endpoint, discriminated by `_action`.
///
/// ```json
/// { "_action": "getPrivate", "email": "ada@example.com" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "_action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ManageUserParams {
    /// Full user record by email. In-process callers, or the user themself.
    GetPrivate { email: String },
    /// Public fields of any user.
    GetPublic { user_id: String },
    /// The caller, if logged in.
    Current,
}
