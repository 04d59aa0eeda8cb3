use crate::server::{Result, ServerError, ServerRouter, auth::LoggedInUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use yestochi_common::model::{
    Id,
    post::Post,
    user::{User, UserMarker, UserPatch},
};
use yestochi_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_get(get_user)
        .typed_patch(update_user)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn list_users(UsersPath(): UsersPath, State(db): State<Arc<DbClient>>) -> Json<Vec<User>> {
    Json(db.list_users().await)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn update_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>> {
    if user.user_id() != id {
        return Err(ServerError::Forbidden(user.user_id()));
    }

    let user = db.update_user_profile(id, patch).await?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct UserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    UserPostsPath { id }: UserPostsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db
        .fetch_user_posts(id)
        .await
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(posts))
}
