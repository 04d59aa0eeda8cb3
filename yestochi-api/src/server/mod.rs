use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use yestochi_common::model::{
    Id, ModelValidationError,
    post::PostMarker,
    user::UserMarker,
};
use yestochi_db::client::{DbClient, DbError};

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Nobody is logged in")]
    NotLoggedIn,
    #[error("Name or password did not match")]
    InvalidCredentials,
    #[error("User {0} may not do this")]
    Forbidden(Id<UserMarker>),
    #[error("Invalid input: {0}")]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("User with id {0} has no nickname.")]
    NicknameNotFound(Id<UserMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::NicknameNotFound(_)
            | ServerError::Database(DbError::UserByIdNotFound(_) | DbError::PostByIdNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServerError::NotLoggedIn | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Database(DbError::NameTaken(_)) => StatusCode::CONFLICT,
            ServerError::JsonRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonResponse(_)
            | ServerError::Database(DbError::PasswordHash(_) | DbError::HashTask(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerState, routes};
    use argon2::Params;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    };
    use serde_json::{Value, json};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;
    use yestochi_common::snowflake::NodeId;
    use yestochi_db::{client::DbClient, kv::MemoryStore};

    async fn app() -> Router {
        let db_client = DbClient::new(Arc::new(MemoryStore::new()), NodeId::default())
            .with_latency(Duration::ZERO)
            .with_password_params(
                Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None).unwrap(),
            );
        db_client.initialize().await.unwrap();

        routes().with_state(ServerState {
            db_client: Arc::new(db_client),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    async fn log_in_as_mark(app: &Router) {
        let (status, _) = send(
            app,
            Method::POST,
            "/auth/login",
            Some(json!({ "name": "mark zuckerbot", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route() {
        let app = app().await;

        let (status, body) = send(&app, Method::GET, "/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": 404 }));
    }

    #[tokio::test]
    async fn list_posts() {
        let app = app().await;

        let (status, body) = send(&app, Method::GET, "/posts", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert!(body[0]["user"]["name"].is_string());
        assert!(body[0]["isLiked"].is_boolean());
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let app = app().await;

        let (status, _) = send(&app, Method::GET, "/users/404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/users/404/posts", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn creating_a_post_requires_login() {
        let app = app().await;

        let (status, _) = send(&app, Method::POST, "/posts", Some(json!({ "text": "hello" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        log_in_as_mark(&app).await;
        let (status, post) =
            send(&app, Method::POST, "/posts", Some(json!({ "text": "hello" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["text"], "hello");
        assert_eq!(post["likes"], 0);
        assert_eq!(post["user"]["id"], "1");

        let (_, posts) = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(posts[0], post);

        let uri = format!("/posts/{}", post["id"].as_str().unwrap());
        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, post);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = app().await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({ "name": "Mark Zuckerbot", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_logs_in() {
        let app = app().await;

        let (status, user) = send(
            &app,
            Method::POST,
            "/auth/register",
            Some(json!({ "name": "Ana", "password": "Password1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(user.get("password").is_none());
        assert!(user.get("passwordHash").is_none());

        let (status, me) = send(&app, Method::GET, "/auth/me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me, user);

        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/register",
            Some(json!({ "name": "ANA", "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn only_own_profile_is_editable() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let (status, _) =
            send(&app, Method::PATCH, "/users/2", Some(json!({ "name": "Wardo" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/users/1",
            Some(json!({ "name": "EDUARDO SAVERIN" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, user) =
            send(&app, Method::PATCH, "/users/1", Some(json!({ "bio": "Oi" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["bio"], "Oi");
        assert_eq!(user["name"], "Mark Zuckerbot");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/posts")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": 400 }));
    }

    #[tokio::test]
    async fn blank_comment_is_unprocessable() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let (status, _) =
            send(&app, Method::POST, "/posts/1/comments", Some(json!({ "text": "  " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, comment) =
            send(&app, Method::POST, "/posts/1/comments", Some(json!({ "text": "Boa" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(comment["user"]["id"], "1");
    }

    #[tokio::test]
    async fn like_toggles() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let (_, liked) = send(&app, Method::POST, "/posts/1/like", None).await;
        assert_eq!(liked["isLiked"], true);
        assert_eq!(liked["likes"], 13);

        let (_, unliked) = send(&app, Method::POST, "/posts/1/like", None).await;
        assert_eq!(unliked["isLiked"], false);
        assert_eq!(unliked["likes"], 12);

        let (status, _) = send(&app, Method::POST, "/posts/404/like", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nicknames() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let (_, nicknames) = send(&app, Method::GET, "/nicknames", None).await;
        assert_eq!(nicknames["2"], "Wardo");

        let (status, _) =
            send(&app, Method::PUT, "/nicknames/2", Some(json!({ "nickname": "" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/nicknames/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn messages() {
        let app = app().await;
        log_in_as_mark(&app).await;

        let (status, message) =
            send(&app, Method::POST, "/messages/2", Some(json!({ "text": "oi" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, thread) = send(&app, Method::GET, "/messages/2", None).await;
        assert_eq!(thread, json!([message]));

        let (_, threads) = send(&app, Method::GET, "/messages", None).await;
        assert_eq!(threads["1-2"], thread);
    }
}
