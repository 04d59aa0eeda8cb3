use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;
use yestochi_common::model::{
    Id,
    user::{User, UserMarker},
};
use yestochi_db::client::DbClient;

/// Whoever the store currently has marked as logged in.
///
/// The marker is process-wide, not per request. Rejects with
/// [`ServerError::NotLoggedIn`] when nobody is.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LoggedInUser(User);

impl LoggedInUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.0.id
    }

    #[must_use]
    pub fn into_user(self) -> User {
        self.0
    }
}

impl<S> FromRequestParts<S> for LoggedInUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Arc::<DbClient>::from_ref(state)
            .fetch_logged_in_user()
            .await
            .map(Self)
            .ok_or(ServerError::NotLoggedIn)
    }
}
