use {
    reqwest::{Request, RequestBuilder, StatusCode},
    serde::de::DeserializeOwned,
};

/// Sends an HTTP request and deserializes the JSON response body into `T`.
///
/// Non-success responses whose body deserializes into `E` are reported as
/// [`RoundtripError::Api`]. Rate limiting and overload responses are always
/// reported as [`Error::Status`], whatever their body.
pub async fn roundtrip_internal<T, E>(
    request: RequestBuilder,
    log_request: impl FnOnce(&Request),
    log_response: impl FnOnce(StatusCode, &str),
) -> Result<T, RoundtripError<E>>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    let (client, request) = request.build_split();
    let request = request.map_err(Error::from)?;
    log_request(&request);
    let response = client.execute(request).await.map_err(Error::from)?;
    let status = response.status();
    let body = response.text().await.map_err(Error::from)?;
    log_response(status, &body);

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|err| Error::from(err).into());
    }
    if is_backpressure(status) {
        return Err(Error::Status(status, body).into());
    }
    match serde_json::from_str::<E>(&body) {
        Ok(err) => Err(RoundtripError::Api(err)),
        Err(_) => Err(Error::Status(status, body).into()),
    }
}

/// Whether the status code asks the client to back off and try later.
pub fn is_backpressure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

macro_rules! roundtrip {
    (<$t:ty, $e:ty>; $request:expr) => {
        $crate::util::http::roundtrip_internal::<$t, $e>(
            $request,
            |request| {
                tracing::trace!(
                    method = %request.method(),
                    url = %request.url(),
                    body = ?request.body().and_then(|b| b.as_bytes()).map(String::from_utf8_lossy),
                    "sending request"
                );
            },
            |status, body| {
                tracing::trace!(%status, %body, "received response");
            },
        )
    };
}

pub(crate) use roundtrip;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("HTTP error {0}: {1:?}")]
    Status(StatusCode, String),
}

impl Error {
    /// Returns the HTTP status code of a non-success response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status(status, _) => Some(*status),
            Error::Request(err) => err.status(),
            Error::Json(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoundtripError<E> {
    #[error(transparent)]
    Http(#[from] Error),
    #[error("API error")]
    Api(E),
}
