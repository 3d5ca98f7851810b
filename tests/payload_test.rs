use invodex::base::IxError;
use invodex::payload::{decode, file_extension, safe_file_name};

#[test]
fn decodes_data_uri() {
    let (bytes, content_type) = decode("data:application/pdf;base64,JVBERi0xLjQK").unwrap();
    assert_eq!(b"%PDF-1.4\n".to_vec(), bytes);
    assert_eq!("application/pdf", &content_type);
    // what went in comes back out
    assert_eq!("JVBERi0xLjQK", &base64::encode(&bytes));
}

#[test]
fn decodes_without_declared_type() {
    let (bytes, content_type) = decode("data:;base64,QUJD").unwrap();
    assert_eq!(b"ABC".to_vec(), bytes);
    assert_eq!("application/octet-stream", &content_type);

    // bare body with a delimiter but no data: prefix
    let (_, content_type) = decode("base64,QUJD").unwrap();
    assert_eq!("application/octet-stream", &content_type);
}

#[test]
fn rejects_missing_delimiter() {
    let err = decode("JVBERi0xLjQK").unwrap_err();
    assert!(matches!(err, IxError::InvalidPayloadFormat(_)));
}

#[test]
fn rejects_malformed_base64() {
    let err = decode("data:application/pdf;base64,!!!").unwrap_err();
    assert!(matches!(err, IxError::InvalidPayloadFormat(_)));
}

#[test]
fn extension_prefers_original_name() {
    assert_eq!("pdf", file_extension(Some("Invoice.PDF"), "application/octet-stream"));
    assert_eq!("jpg", file_extension(None, "image/jpeg"));
    assert_eq!("pdf", file_extension(Some("no-extension"), "application/pdf"));
    assert_eq!("bin", file_extension(None, "text/strange"));
    // a dubious extension falls back to the content type
    assert_eq!("png", file_extension(Some("weird.p ng"), "image/png"));
    assert_eq!("bin", file_extension(Some("trailing."), "application/zip"));
}

#[test]
fn safe_names_carry_nothing_from_the_original() {
    let name = safe_file_name(Some("../../../etc/passwd un🧨safe.pdf"), "application/pdf");
    assert!(name.ends_with(".pdf"));
    let stem = name.trim_end_matches(".pdf");
    assert_eq!(20, stem.len());
    assert!(stem.chars().all(|c| c.is_ascii_alphanumeric()));

    // collision resistant in practice
    let other = safe_file_name(Some("same.pdf"), "application/pdf");
    assert_ne!(name, other);
}
