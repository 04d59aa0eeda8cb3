use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::{Serialize, de::DeserializeOwned};

/// JSON request and response bodies.
///
/// Malformed bodies are rejected as [`ServerError::JsonRejection`], so clients
/// get the same `{"status": ..}` body as for any other failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumJson(value) = AxumJson::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        serde_json::to_vec(&self.0)
            .map(|body| (TypedHeader(ContentType::json()), body))
            .map_err(ServerError::JsonResponse)
            .into_response()
    }
}
