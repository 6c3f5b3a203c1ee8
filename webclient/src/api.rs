use seed::browser::fetch::{FetchError, Method, Request};
use shared::model::{
    AddToQueueRequest, PlaybackState, QueueSnapshot, RegisterRequest, RegisterResponse,
    SearchResponse, Track, User,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Fetch(String),
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        ApiError::Fetch(format!("{:?}", error))
    }
}

pub async fn register(url: String, request: RegisterRequest) -> Result<User, ApiError> {
    let response: RegisterResponse = Request::new(url)
        .method(Method::Post)
        .json(&request)?
        .fetch()
        .await?
        .check_status()?
        .json()
        .await?;

    Ok(response.user)
}

pub async fn fetch_queue(url: String) -> Result<QueueSnapshot, ApiError> {
    Ok(Request::new(url)
        .fetch()
        .await?
        .check_status()?
        .json()
        .await?)
}

pub async fn add_to_queue(url: String, track_id: String) -> Result<(), ApiError> {
    Request::new(url)
        .method(Method::Post)
        .json(&AddToQueueRequest { id: track_id })?
        .fetch()
        .await?
        .check_status()?;

    Ok(())
}

pub async fn remove_from_queue(url: String) -> Result<(), ApiError> {
    Request::new(url)
        .method(Method::Delete)
        .fetch()
        .await?
        .check_status()?;

    Ok(())
}

pub async fn search(url: String) -> Result<Vec<Track>, ApiError> {
    let response: SearchResponse = Request::new(url)
        .fetch()
        .await?
        .check_status()?
        .json()
        .await?;

    Ok(response.into_tracks())
}

pub async fn radio_status(url: String) -> Result<PlaybackState, ApiError> {
    Ok(Request::new(url)
        .fetch()
        .await?
        .check_status()?
        .json()
        .await?)
}
