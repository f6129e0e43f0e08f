use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::num;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {body}")]
    StoreRejected { status: u16, body: String },

    #[error("json error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] num::ParseIntError),
}

impl Error {
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::StoreRejected { .. })
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::StoreUnavailable(_) | Error::StoreRejected { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_store_failure() {
            "vote store unavailable, please try again later".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
