use std::fmt::{Display, Formatter};

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Debug)]
pub enum ServiceError {
    InternalErr(String),
    DataNotFound,
}

impl<T> From<T> for ServiceError where T: Display {
    fn from(err: T) -> Self {
        Self::InternalErr(format!("{}", err))
    }
}

#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.0
    }
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.0).json(serde_json::json!({ "error": self.1 }))
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DataNotFound => Self(StatusCode::NOT_FOUND, "Scan not found".to_owned()),
            ServiceError::InternalErr(msg) => {
                log::error!("Internal error: {}", msg);
                Self(StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_owned())
            },
        }
    }
}
