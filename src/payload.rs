use crate::base::{IxError, IxResult};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

const PAYLOAD_DELIMITER: &str = "base64,";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_EXTENSION: &str = "bin";
const FILE_TOKEN_LEN: usize = 20;

// Splits a data URI ("data:application/pdf;base64,JVBERi...") into raw bytes
// and the declared content type. Everything after the first "base64," marker is
// the body; a body that is not valid base64 is rejected, never truncated.
pub fn decode(encoded: &str) -> IxResult<(Vec<u8>, String)> {
    let idx = encoded.find(PAYLOAD_DELIMITER).ok_or_else(|| {
        IxError::InvalidPayloadFormat(String::from("missing base64 delimiter"))
    })?;
    let (prefix, rest) = encoded.split_at(idx);
    let body = &rest[PAYLOAD_DELIMITER.len()..];
    let bytes = base64::decode(body)
        .map_err(|e| IxError::InvalidPayloadFormat(format!("malformed base64 body: {}", e)))?;
    Ok((bytes, content_type_of(prefix)))
}

fn content_type_of(prefix: &str) -> String {
    prefix
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|ct| !ct.is_empty())
        .map(String::from)
        .unwrap_or_else(|| String::from(DEFAULT_CONTENT_TYPE))
}

// The stored name carries nothing from the caller-supplied name except a
// sanitized extension, so path separators or control characters in the
// original can never reach a storage key.
pub fn safe_file_name(original_name: Option<&str>, content_type: &str) -> String {
    let token: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FILE_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{}.{}", token, file_extension(original_name, content_type))
}

pub fn file_extension(original_name: Option<&str>, content_type: &str) -> String {
    if let Some(name) = original_name {
        if let Some(idx) = name.rfind('.') {
            let ext = &name[idx + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return ext.to_lowercase();
            }
        }
    }
    String::from(match content_type {
        "application/pdf" => "pdf",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => DEFAULT_EXTENSION,
    })
}
