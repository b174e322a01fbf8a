use thiserror::Error;

#[derive(Debug, Error)]
pub enum DuitkuApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the payment gateway: {0}")]
    Unreachable(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Gateway query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway rejected the request. Code {code}. {message}")]
    Rejected { code: String, message: String },
}
