//! Validates the browser's client-data envelope.

use crate::u2f::{codec, error::Error, transport::RequestType};
use serde::Deserialize;

#[derive(Deserialize)]
struct ClientData {
    typ: Option<String>,
    origin: Option<String>,
    challenge: Option<String>,
}

/// Normalizes `raw` (either a JSON string, or URL-safe base64 of one) to its
/// canonical JSON string form. This is the string that gets SHA-256 hashed
/// downstream, so it must be returned byte-for-byte as received rather than
/// re-serialized from a parsed structure.
fn standardize(raw: &str) -> Result<String, Error> {
    if raw.contains('{') {
        Ok(raw.to_owned())
    } else {
        let decoded = codec::websafe_decode(raw)?;
        String::from_utf8(decoded)
            .map_err(|_| Error::BadClientData("client data was not valid ASCII/UTF-8".into()))
    }
}

/// Validates `raw_client_data` against the expected request type, app id,
/// and challenge, returning the canonical client-data string on success.
/// Any parse failure, missing field, or mismatch raises
/// [`Error::BadClientData`].
pub fn validate_client_data(
    raw_client_data: &str,
    request_type: RequestType,
    app_id: &str,
    expected_challenge: &str,
) -> Result<String, Error> {
    let canonical = standardize(raw_client_data)?;
    let parsed: ClientData = serde_json::from_str(&canonical)
        .map_err(|e| Error::BadClientData(format!("invalid JSON: {}", e)))?;

    if parsed.typ.as_deref() != Some(request_type.as_str()) {
        return Err(Error::BadClientData("invalid or missing request type".into()));
    }
    if parsed.origin.as_deref() != Some(app_id) {
        return Err(Error::BadClientData("invalid or missing origin".into()));
    }
    if parsed.challenge.as_deref() != Some(expected_challenge) {
        return Err(Error::BadClientData("invalid or missing challenge".into()));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_data_json(typ: &str, origin: &str, challenge: &str) -> String {
        format!(
            r#"{{"typ":"{}","origin":"{}","challenge":"{}"}}"#,
            typ, origin, challenge
        )
    }

    #[test]
    fn accepts_raw_json() {
        let raw = client_data_json("navigator.id.finishEnrollment", "https://example.com", "chal");
        let result =
            validate_client_data(&raw, RequestType::Register, "https://example.com", "chal")
                .unwrap();
        assert_eq!(result, raw);
    }

    #[test]
    fn accepts_base64_encoded_json() {
        let raw = client_data_json("navigator.id.getAssertion", "https://example.com", "chal");
        let encoded = codec::websafe_encode(raw.as_bytes());
        let result =
            validate_client_data(&encoded, RequestType::Sign, "https://example.com", "chal")
                .unwrap();
        assert_eq!(result, raw);
    }

    #[test]
    fn rejects_origin_mismatch() {
        let raw = client_data_json("navigator.id.finishEnrollment", "https://evil.example", "chal");
        let err =
            validate_client_data(&raw, RequestType::Register, "https://example.com", "chal")
                .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_wrong_request_type() {
        let raw = client_data_json("navigator.id.getAssertion", "https://example.com", "chal");
        assert!(
            validate_client_data(&raw, RequestType::Register, "https://example.com", "chal")
                .is_err()
        );
    }

    #[test]
    fn rejects_challenge_mismatch() {
        let raw = client_data_json("navigator.id.finishEnrollment", "https://example.com", "other");
        assert!(
            validate_client_data(&raw, RequestType::Register, "https://example.com", "chal")
                .is_err()
        );
    }
}
