use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("cannot decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid client configuration: {0}")]
    Build(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("unknown agent '{id}'")]
    UnknownAgent { id: String },
}
