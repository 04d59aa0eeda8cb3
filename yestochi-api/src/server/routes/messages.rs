use crate::server::{
    Result, ServerError, ServerRouter, auth::LoggedInUser, json::Json, routes::TextBody,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use yestochi_common::model::{
    Id, ModelValidationError,
    message::Message,
    post::CommentText,
    user::UserMarker,
};
use yestochi_db::client::{DbClient, MessageThreads};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_threads)
        .typed_get(get_thread)
        .typed_post(send_message)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/messages", rejection(ServerError))]
struct MessagesPath();

async fn list_threads(
    MessagesPath(): MessagesPath,
    State(db): State<Arc<DbClient>>,
) -> Json<MessageThreads> {
    Json(db.list_message_threads().await)
}

/// The thread between the logged-in user and `id`.
#[derive(TypedPath, Deserialize)]
#[typed_path("/messages/{id}", rejection(ServerError))]
struct ThreadPath {
    id: Id<UserMarker>,
}

async fn get_thread(
    ThreadPath { id }: ThreadPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
) -> Json<Vec<Message>> {
    Json(db.fetch_thread(user.user_id(), id).await)
}

async fn send_message(
    ThreadPath { id }: ThreadPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
    Json(TextBody { text }): Json<TextBody>,
) -> Result<Json<Message>> {
    let text = CommentText::new(text).map_err(ModelValidationError::from)?;
    let message = db.send_message(user.user_id(), id, text).await?;

    Ok(Json(message))
}
