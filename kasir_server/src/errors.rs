use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use duitku_tools::DuitkuApiError;
use kasir_engine::PosDatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Identity headers missing or malformed. {0}")]
    InvalidIdentity(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    InvalidState(String),
    #[error("Callback signature is invalid")]
    InvalidCallbackSignature,
    #[error("The payment gateway could not be reached. {0}")]
    GatewayUnavailable(String),
    #[error("The payment gateway rejected the request. Code {code}. {message}")]
    GatewayRejected { code: String, message: String },
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::GatewayRejected { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidCallbackSignature => StatusCode::FORBIDDEN,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PosDatabaseError> for ServerError {
    fn from(e: PosDatabaseError) -> Self {
        match &e {
            PosDatabaseError::ProductNotFound(_) |
            PosDatabaseError::TransactionNotFound(_) |
            PosDatabaseError::PaymentNotFound(_) |
            PosDatabaseError::MerchantOrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            PosDatabaseError::InsufficientStock { .. } |
            PosDatabaseError::InvalidQuantity { .. } |
            PosDatabaseError::EmptyUpdate => Self::InvalidRequestBody(e.to_string()),
            PosDatabaseError::TransactionAlreadyCancelled(_) |
            PosDatabaseError::TransactionCompleted(_) |
            PosDatabaseError::TransactionAlreadyPaid(_) |
            PosDatabaseError::TransactionNotPayable(_) => Self::InvalidState(e.to_string()),
            PosDatabaseError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<DuitkuApiError> for ServerError {
    fn from(e: DuitkuApiError) -> Self {
        match e {
            DuitkuApiError::Rejected { code, message } => Self::GatewayRejected { code, message },
            DuitkuApiError::Unreachable(m) | DuitkuApiError::Initialization(m) => Self::GatewayUnavailable(m),
            DuitkuApiError::QueryError { status, message } => {
                Self::GatewayUnavailable(format!("Gateway returned {status}: {message}"))
            },
            DuitkuApiError::JsonError(m) => Self::BackendError(m),
        }
    }
}
