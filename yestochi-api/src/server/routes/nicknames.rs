use crate::server::{Result, ServerError, ServerRouter, auth::LoggedInUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use yestochi_common::model::{
    Id,
    nickname::{Nickname, Nicknames},
    user::UserMarker,
};
use yestochi_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_nicknames)
        .typed_get(get_nickname)
        .typed_put(set_nickname)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/nicknames", rejection(ServerError))]
struct NicknamesPath();

async fn list_nicknames(
    NicknamesPath(): NicknamesPath,
    State(db): State<Arc<DbClient>>,
) -> Json<Nicknames> {
    Json(db.list_nicknames().await)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/nicknames/{id}", rejection(ServerError))]
struct NicknamePath {
    id: Id<UserMarker>,
}

async fn get_nickname(
    NicknamePath { id }: NicknamePath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Nickname>> {
    let nickname = db
        .fetch_nickname(id)
        .await
        .ok_or(ServerError::NicknameNotFound(id))?;

    Ok(Json(nickname))
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct NicknameBody {
    nickname: String,
}

/// A blank nickname removes the entry.
async fn set_nickname(
    NicknamePath { id }: NicknamePath,
    State(db): State<Arc<DbClient>>,
    _user: LoggedInUser,
    Json(NicknameBody { nickname }): Json<NicknameBody>,
) -> Json<Nicknames> {
    Json(db.set_nickname(id, &nickname).await)
}
