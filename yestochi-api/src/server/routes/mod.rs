use crate::server::ServerRouter;
use axum::Router;
use serde::Deserialize;

mod auth;
mod messages;
mod nicknames;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(posts::routes())
        .merge(nicknames::routes())
        .merge(messages::routes())
}

/// Body of comment and message submissions.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct TextBody {
    text: String,
}
