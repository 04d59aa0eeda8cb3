use crate::server::{Result, ServerError, ServerRouter, auth::LoggedInUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yestochi_common::model::{
    auth::Password,
    user::{CreateUser, User},
};
use yestochi_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(login)
        .typed_post(register)
        .typed_post(logout)
        .typed_get(me)
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct LoginBody {
    name: String,
    password: Password,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    Json(LoginBody { name, password }): Json<LoginBody>,
) -> Result<Json<User>> {
    let user = db
        .authenticate(&name, &password)
        .await
        .ok_or(ServerError::InvalidCredentials)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    Json(create_user): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = db.register(create_user).await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/logout", rejection(ServerError))]
struct LogoutPath();

async fn logout(LogoutPath(): LogoutPath, State(db): State<Arc<DbClient>>) -> StatusCode {
    db.logout().await;
    StatusCode::NO_CONTENT
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/me", rejection(ServerError))]
struct MePath();

async fn me(MePath(): MePath, user: LoggedInUser) -> Json<User> {
    Json(user.into_user())
}
