use crate::server::{
    Result, ServerError, ServerRouter, auth::LoggedInUser, json::Json, routes::TextBody,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yestochi_common::model::{
    Id, ModelValidationError,
    post::{Comment, CommentText, Post, PostContent, PostMarker},
};
use yestochi_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(PostsPath(): PostsPath, State(db): State<Arc<DbClient>>) -> Json<Vec<Post>> {
    Json(db.list_posts().await)
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct CreatePostBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    image: Option<String>,
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
    Json(CreatePostBody { text, image }): Json<CreatePostBody>,
) -> Result<Json<Post>> {
    let content = PostContent::new(text, image).map_err(ModelValidationError::from)?;
    let post = db.create_post(content, user.user_id()).await?;

    info!(post_id = %post.id, user_id = %user.user_id(), "Post created");
    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

/// Only the author may delete a post. Replies with the remaining posts.
async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
) -> Result<Json<Vec<Post>>> {
    let post = db
        .fetch_post(id)
        .await
        .ok_or(ServerError::PostByIdNotFound(id))?;
    if post.user.id != user.user_id() {
        return Err(ServerError::Forbidden(user.user_id()));
    }

    let posts = db.delete_post(id).await;

    info!(post_id = %id, "Post deleted");
    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct PostLikePath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    PostLikePath { id }: PostLikePath,
    State(db): State<Arc<DbClient>>,
    _user: LoggedInUser,
) -> Result<Json<Post>> {
    let post = db.toggle_like(id).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
    user: LoggedInUser,
    Json(TextBody { text }): Json<TextBody>,
) -> Result<Json<Comment>> {
    let text = CommentText::new(text).map_err(ModelValidationError::from)?;
    let comment = db.add_comment(id, text, user.user_id()).await?;

    Ok(Json(comment))
}
