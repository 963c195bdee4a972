//! Top-level error type for the U2F core.
//!
//! Callers need to distinguish three error *kinds* by contract, not type
//! machinery: a hand-rolled flat enum plus a [`kind`](Error::kind) accessor
//! models that directly, rather than reaching for a derive-macro error
//! crate.

use std::fmt;

/// The three error categories a caller must distinguish.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition on session state was violated (challenge absent).
    /// Recoverable by restarting the ceremony; not itself an attack signal.
    State,

    /// Something is wrong with caller- or client-supplied bytes: bad
    /// encoding, truncated message, signature failure, unknown key handle,
    /// counter regression, client-data mismatch.
    InvalidData,

    /// A caller programming error, e.g. requesting a signing challenge with
    /// zero eligible devices.
    Caller,
}

/// All errors the U2F core can raise.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// No registration or signing challenge was found under the expected
    /// session key.
    MissingChallenge,

    /// `response.version` was present but not `"U2F_V2"`.
    UnsupportedVersion,

    /// Registration or signature data was not valid URL-safe base64.
    BadBase64(base64::DecodeError),

    /// Client data was not parseable JSON, or was missing/mismatched
    /// `typ`/`origin`/`challenge` fields.
    BadClientData(String),

    /// Raw registration message did not start with the `0x05` magic byte,
    /// or was truncated before a fixed-length field could be read.
    MalformedRegistrationData(&'static str),

    /// Raw signature message was truncated before a fixed-length field
    /// could be read.
    MalformedSignatureData(&'static str),

    /// The attestation certificate failed to parse as DER X.509.
    BadCertificate,

    /// More than one (or zero) X.509 certificates were present in `x5c`.
    WrongCertificateCount,

    /// Converting the `app_id` to IDNA-ASCII failed.
    BadAppId,

    /// The attestation signature did not verify against the certificate's
    /// public key.
    AttestationSignatureInvalid,

    /// The assertion signature did not verify against the stored device's
    /// public key.
    AssertionSignatureInvalid,

    /// No device in the candidate set has the key handle named in the
    /// response.
    UnknownKeyHandle,

    /// The counter in a signature response did not exceed the device's
    /// stored counter (probable cloned token).
    CounterRegression,

    /// Caller asked for a signing challenge with no eligible devices.
    NoEligibleDevices,
}

impl Error {
    /// Returns the [`ErrorKind`] bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingChallenge => ErrorKind::State,
            Error::NoEligibleDevices => ErrorKind::Caller,
            _ => ErrorKind::InvalidData,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingChallenge => write!(f, "session is missing the expected challenge"),
            Error::UnsupportedVersion => write!(f, "unsupported U2F version given"),
            Error::BadBase64(e) => write!(f, "invalid base64: {}", e),
            Error::BadClientData(reason) => write!(f, "invalid client data: {}", reason),
            Error::MalformedRegistrationData(reason) => {
                write!(f, "malformed registration data: {}", reason)
            }
            Error::MalformedSignatureData(reason) => {
                write!(f, "malformed signature data: {}", reason)
            }
            Error::BadCertificate => write!(f, "failed to parse attestation certificate"),
            Error::WrongCertificateCount => {
                write!(f, "expected exactly one attestation certificate")
            }
            Error::BadAppId => write!(f, "app_id could not be encoded as IDNA-ASCII"),
            Error::AttestationSignatureInvalid => {
                write!(f, "attestation signature is invalid")
            }
            Error::AssertionSignatureInvalid => write!(f, "assertion signature is invalid"),
            Error::UnknownKeyHandle => write!(f, "no registered device matches the key handle"),
            Error::CounterRegression => {
                write!(f, "signature counter did not increase (possible cloned token)")
            }
            Error::NoEligibleDevices => {
                write!(f, "cannot issue a signing challenge with no eligible devices")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Error {
        Error::BadBase64(e)
    }
}
