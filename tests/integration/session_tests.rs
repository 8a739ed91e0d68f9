//! Integration tests for portable session strings

use tg_forward::output::ApiError;
use tg_forward::session::{self, AUTH_KEY_LEN};
use tg_forward::{CodecError, SessionHandle};

fn auth_key() -> Vec<u8> {
    (0..AUTH_KEY_LEN).map(|i| (i * 7 % 251) as u8).collect()
}

#[test]
fn test_encoded_string_is_url_safe() {
    let handle = SessionHandle::new(2, "149.154.167.51:443", auth_key());
    let encoded = session::encode(&handle).unwrap();

    assert!(encoded.starts_with('1'));
    assert!(encoded[1..]
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
    assert_eq!(session::decode(&encoded).unwrap(), handle);
}

#[test]
fn test_ipv6_handle_restores_bracketed_address() {
    let handle = SessionHandle::new(5, "[2001:67c:4e8:f004::b]:443", auth_key());
    let decoded = session::decode(&session::encode(&handle).unwrap()).unwrap();

    assert_eq!(decoded.address, "[2001:67c:4e8:f004::b]:443");
    assert_eq!(decoded.socket_addr().unwrap().port(), 443);
    assert_eq!(decoded.auth_key_id(), handle.auth_key_id());
}

#[test]
fn test_mapped_ipv4_is_stored_compactly() {
    let mapped = SessionHandle::new(1, "[::ffff:10.1.2.3]:80", auth_key());
    let plain = SessionHandle::new(1, "10.1.2.3:80", auth_key());

    let encoded = session::encode(&mapped).unwrap();
    assert_eq!(encoded, session::encode(&plain).unwrap());
    assert_eq!(session::decode(&encoded).unwrap().address, "10.1.2.3:80");
}

#[test]
fn test_corrupted_strings_are_rejected() {
    let encoded = session::encode(&SessionHandle::new(2, "10.0.0.1:443", auth_key())).unwrap();

    let truncated = &encoded[..encoded.len() / 2];
    assert!(matches!(
        session::decode(truncated),
        Err(CodecError::Truncated(_)) | Err(CodecError::InvalidBase64(_))
    ));

    let wrong_version = format!("0{}", &encoded[1..]);
    assert_eq!(
        session::decode(&wrong_version),
        Err(CodecError::UnsupportedVersion('0'))
    );
}

#[test]
fn test_codec_errors_map_to_bad_request() {
    let err = session::decode("").unwrap_err();
    let api: ApiError = (&err).into();
    assert_eq!(api.status, 400);
    assert_eq!(api.code, "INVALID_SESSION");
}
