use rocket::serde::{Deserialize, Serialize};

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::{Bool, Text};
use figment::value::magic::RelativePathBuf;
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket_sync_db_pools::database;
use rusoto_core::Region;
use slog_scope::warn;
use std::error::Error as StdError;
use std::fmt;
use std::io::Cursor;
use uuid::Uuid;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    pub storage_bucket: String,
    pub storage_base_url: String,
    #[serde(default)]
    pub storage_root: Option<RelativePathBuf>,
    #[serde(default)]
    pub storage_endpoint: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub extract_api_key: Option<String>,
    #[serde(default = "default_extract_model")]
    pub extract_model: String,
    #[serde(default = "default_extract_base_url")]
    pub extract_base_url: String,
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,
    #[serde(default)]
    pub notify_from: Option<String>,
    #[serde(default)]
    pub notify_to: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_secs: u64,
}

fn default_jwt_audience() -> String {
    String::from("authenticated")
}

fn default_storage_backend() -> String {
    String::from("s3")
}

fn default_extract_model() -> String {
    String::from("gemini-1.5-flash")
}

fn default_extract_base_url() -> String {
    String::from("https://generativelanguage.googleapis.com")
}

fn default_extract_timeout() -> u64 {
    30
}

fn default_notify_timeout() -> u64 {
    10
}

impl Config {
    pub fn region(&self) -> Region {
        self.aws_region
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(Region::EuWest1)
    }

    // a custom endpoint (minio and friends) takes precedence for object storage
    pub fn storage_region(&self) -> Region {
        match &self.storage_endpoint {
            Some(endpoint) => Region::Custom {
                name: self
                    .aws_region
                    .clone()
                    .unwrap_or_else(|| String::from("local")),
                endpoint: endpoint.clone(),
            },
            None => self.region(),
        }
    }
}

#[database("postgres_main")]
pub struct MainDbConn(diesel::PgConnection);

const APP_USER_SETTING: &str = "invodex.user_id";

sql_function! {
    fn set_config(setting_name: Text, new_value: Text, is_local: Bool) -> Text;
}

// Runs a closure inside a transaction scoped to the caller's identity: row level
// security policies read invodex.user_id, so statements only ever see rows the
// authenticated user owns or is a member of.
pub async fn run_as<T, F>(conn: &MainDbConn, caller: Uuid, f: F) -> IxResult<T>
where
    F: FnOnce(&PgConnection) -> Result<T, DieselError> + Send + 'static,
    T: Send + 'static,
{
    let result = conn
        .run(move |c| {
            let c = &*c;
            c.transaction(|| {
                diesel::select(set_config(APP_USER_SETTING, caller.to_string(), true))
                    .execute(c)?;
                f(c)
            })
        })
        .await?;
    Ok(result)
}

#[derive(Debug)]
pub enum IxError {
    Unauthenticated,
    NoOrganization,
    ValidationFailed {
        field: &'static str,
        reason: &'static str,
    },
    InvalidPayloadFormat(String),
    StorageWriteFailed(String),
    PersistenceFailed(String),
    ExtractionUnavailable(String),
    NotificationFailed(String),
    NoActiveSession,
    NotFound,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new<S: Into<String>>(error: S, details: Option<String>, code: &str) -> Self {
        ApiError {
            error: error.into(),
            details,
            code: Some(String::from(code)),
        }
    }
}

impl IxError {
    fn status(&self) -> Status {
        match self {
            IxError::Unauthenticated => Status::Unauthorized,
            IxError::NoOrganization => Status::Forbidden,
            IxError::ValidationFailed { .. } => Status::BadRequest,
            IxError::InvalidPayloadFormat(_) => Status::BadRequest,
            IxError::NotFound => Status::NotFound,
            _ => Status::InternalServerError,
        }
    }

    fn body(&self) -> ApiError {
        match self {
            IxError::Unauthenticated => ApiError::new(
                "authentication required",
                Some(String::from("provide a valid bearer token")),
                "unauthenticated",
            ),
            IxError::NoOrganization => ApiError::new(
                "no organization membership",
                Some(String::from(
                    "create an organization before working with invoices",
                )),
                "no_organization",
            ),
            IxError::ValidationFailed { field, reason } => ApiError::new(
                "validation failed",
                Some(format!("{} {}", field, reason)),
                "validation_failed",
            ),
            IxError::InvalidPayloadFormat(msg) => {
                ApiError::new("invalid file payload", Some(msg.clone()), "invalid_payload_format")
            }
            IxError::StorageWriteFailed(msg) => ApiError::new(
                "object storage write failed",
                Some(msg.clone()),
                "storage_write_failed",
            ),
            IxError::PersistenceFailed(msg) => ApiError::new(
                "could not persist record",
                Some(msg.clone()),
                "persistence_failed",
            ),
            IxError::ExtractionUnavailable(msg) => ApiError::new(
                "field extraction unavailable",
                Some(msg.clone()),
                "extraction_unavailable",
            ),
            IxError::NotificationFailed(msg) => ApiError::new(
                "notification delivery failed",
                Some(msg.clone()),
                "notification_failed",
            ),
            IxError::NoActiveSession => ApiError::new(
                "no active session",
                Some(String::from("sign in again and retry")),
                "no_active_session",
            ),
            IxError::NotFound => ApiError::new("not found", None, "not_found"),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for IxError {
    fn respond_to(self, _request: &'r Request<'_>) -> response::Result<'o> {
        warn!("request failed"; "error" => %self);
        let status = self.status();
        let body = serde_json::to_string(&self.body()).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl fmt::Display for IxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IxError::Unauthenticated => f.write_str("authentication required"),
            IxError::NoOrganization => f.write_str("no organization membership"),
            IxError::ValidationFailed { field, reason } => {
                write!(f, "validation failed: {} {}", field, reason)
            }
            IxError::InvalidPayloadFormat(msg) => write!(f, "invalid file payload: {}", msg),
            IxError::StorageWriteFailed(msg) => write!(f, "object storage write failed: {}", msg),
            IxError::PersistenceFailed(msg) => write!(f, "could not persist record: {}", msg),
            IxError::ExtractionUnavailable(msg) => {
                write!(f, "field extraction unavailable: {}", msg)
            }
            IxError::NotificationFailed(msg) => write!(f, "notification delivery failed: {}", msg),
            IxError::NoActiveSession => f.write_str("no active session"),
            IxError::NotFound => f.write_str("not found"),
        }
    }
}

impl StdError for IxError {}

impl From<DieselError> for IxError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => IxError::NotFound,
            e => IxError::PersistenceFailed(e.to_string()),
        }
    }
}

impl From<uuid::Error> for IxError {
    fn from(_: uuid::Error) -> Self {
        IxError::NotFound
    }
}

pub type IxResult<T> = std::result::Result<T, IxError>;
