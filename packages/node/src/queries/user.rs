//! The `user` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use siteframe_api::{codes, Envelope, ManageUserParams, PublicUser, User, UserRole};

use crate::error::QueryError;
use crate::query::{EndpointMeta, Query};
use crate::storage::Storage;

/// Either view of a user, depending on the action.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserView {
    Private(User),
    Public(PublicUser),
}

/// User lookups. Also the user store behind bearer authorization.
pub struct ManageUser {
    storage: Arc<dyn Storage>,
}

impl ManageUser {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The full record for `email`.
    ///
    /// Only in-process callers and the user themself may read it.
    pub async fn get_private(
        &self,
        email: &str,
        meta: &EndpointMeta,
    ) -> Result<Option<User>, QueryError> {
        if !meta.server {
            let bearer = meta.require_bearer()?;
            if bearer.email != email {
                return Err(QueryError::exposed(
                    codes::FORBIDDEN,
                    "you can only read your own account",
                ));
            }
        }
        Ok(self.storage.get_user_by_email(email).await?)
    }

    pub async fn get_public(&self, user_id: &str) -> Result<Option<PublicUser>, QueryError> {
        Ok(self
            .storage
            .get_user(user_id)
            .await?
            .map(|u| u.to_public()))
    }

    /// Create the user for `email` if it does not exist yet.
    ///
    /// Not reachable over HTTP; used to seed accounts.
    pub async fn ensure(
        &self,
        email: &str,
        full_name: Option<&str>,
        role: UserRole,
    ) -> Result<User, QueryError> {
        if let Some(existing) = self.storage.get_user_by_email(email).await? {
            return Ok(existing);
        }
        let user = User {
            user_id: uuid::Uuid::now_v7().to_string(),
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
            role,
            created_at: super::now_rfc3339(),
        };
        self.storage.put_user(&user).await?;
        tracing::info!(user_id = %user.user_id, "user created");
        Ok(user)
    }
}

#[async_trait]
impl Query for ManageUser {
    type Params = ManageUserParams;
    type Output = UserView;

    async fn run(
        &self,
        params: ManageUserParams,
        meta: &EndpointMeta,
    ) -> Result<Envelope<UserView>, QueryError> {
        let view = match params {
            ManageUserParams::GetPrivate { email } => {
                self.get_private(&email, meta).await?.map(UserView::Private)
            }
            ManageUserParams::GetPublic { user_id } => {
                self.get_public(&user_id).await?.map(UserView::Public)
            }
            ManageUserParams::Current => meta.bearer.clone().map(UserView::Private),
        };

        Ok(match view {
            Some(view) => Envelope::success(view),
            None => Envelope::ok(),
        })
    }
}
