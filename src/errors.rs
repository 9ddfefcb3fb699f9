use diesel::result::DatabaseErrorKind;
use rocket::{
    catch, catchers,
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Catcher, Request,
};
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;

use crate::{provider::LlmError, rag::IngestError, utils::EncryptionError};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] diesel::result::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Authentication(msg.into())
    }

    /// HTTP status and client-facing message for this error
    fn status_and_message(&self) -> (Status, String) {
        match self {
            ApiError::Authentication(msg) => (Status::Unauthorized, msg.clone()),
            ApiError::Forbidden(msg) => (Status::Forbidden, msg.clone()),
            ApiError::BadRequest(msg) => (Status::BadRequest, msg.clone()),
            ApiError::NotFound(msg) => (Status::NotFound, msg.clone()),
            ApiError::Db(diesel::result::Error::NotFound) => {
                (Status::NotFound, "Not found".to_owned())
            }
            ApiError::Db(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => (Status::BadRequest, "Record already exists".to_owned()),
            ApiError::Db(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => (Status::BadRequest, "Referenced record does not exist".to_owned()),
            ApiError::Ingest(error) if error.is_client_error() => {
                (Status::BadRequest, error.to_string())
            }
            ApiError::Ingest(error) => (
                Status::InternalServerError,
                format!("File processing failed: {}", error),
            ),
            ApiError::Token(_) => (Status::Unauthorized, "Invalid token".to_owned()),
            ApiError::Llm(error) => (Status::BadGateway, format!("Model error: {}", error)),
            _ => (Status::InternalServerError, "Server error".to_owned()),
        }
    }
}

/// Failure envelope
#[derive(Debug, JsonSchema, serde::Serialize)]
pub struct FailMessage {
    status: &'static str,
    msg: String,
}
impl FailMessage {
    fn new(msg: &str) -> Self {
        Self {
            status: "FAIL",
            msg: msg.to_string(),
        }
    }
}

/// API error response handling
impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let (status, msg) = self.status_and_message();
        if status.code >= 500 {
            rocket::error!("API error: {:?}", self);
        } else {
            rocket::info!("API error: {:?}", self);
        }
        let mut response = Json(FailMessage::new(&msg)).respond_to(req)?;
        response.set_status(status);
        Ok(response)
    }
}

/// Default JSON catchers for request errors.
pub fn get_catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        payload_too_large,
        unprocessable_entity,
        server_error
    ]
}
#[catch(400)]
fn bad_request(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Bad request"))
}
#[catch(401)]
fn unauthorized(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Unauthorized"))
}
#[catch(403)]
fn forbidden(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Forbidden"))
}
#[catch(404)]
fn not_found(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Not found"))
}
#[catch(413)]
fn payload_too_large(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("File size exceeds maximum"))
}
#[catch(422)]
fn unprocessable_entity(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Incorrectly formatted"))
}
#[catch(500)]
fn server_error(_req: &Request) -> Json<FailMessage> {
    Json(FailMessage::new("Server error"))
}

/// OpenAPI specification for API error responses
impl OpenApiResponderInner for ApiError {
    fn responses(
        gen: &mut rocket_okapi::r#gen::OpenApiGenerator,
    ) -> rocket_okapi::Result<rocket_okapi::okapi::openapi3::Responses> {
        use rocket_okapi::okapi::openapi3::{
            MediaType, RefOr, Response as OpenApiResponse, Responses,
        };

        let mut responses = schemars::Map::new();
        let mut content = schemars::Map::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: Some(gen.json_schema::<FailMessage>()),
                ..Default::default()
            },
        );
        let response_data = vec![
            ("400", "Bad request"),
            ("401", "Authentication error"),
            ("403", "Insufficient tenant role"),
            ("404", "Not found"),
            ("422", "Incorrectly formatted"),
            ("500", "Internal error"),
        ];
        for (status, description) in response_data {
            responses.insert(
                status.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    content: content.clone(),
                    ..Default::default()
                }),
            );
        }
        Ok(Responses {
            responses,
            ..Default::default()
        })
    }
}
