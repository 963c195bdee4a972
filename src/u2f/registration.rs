//! Registration response parsing/verification and the registration
//! ceremony manager.

use crate::u2f::{
    client_data::validate_client_data,
    codec,
    device::{Device, DeviceDescriptor},
    error::Error,
    session::Session,
    transport::{RequestType, U2FTransport, U2FTransports},
    Config,
};
use serde::{Deserialize, Serialize};
use untrusted::Input;
use webpki::{EndEntityCert, ECDSA_P256_SHA256};

const U2F_V2: &str = "U2F_V2";
const REGISTRATION_SESSION_KEY: &str = "u2f_registration_challenge";
const TRANSPORTS_EXTENSION_OID: &str = "1.3.6.1.4.1.45724.2.1.1";

/// The raw registration message, parsed into its component fields prior to
/// verification. Transient — discarded once verified.
struct RegistrationData {
    public_key: Vec<u8>,
    key_handle: Vec<u8>,
    certificate: Vec<u8>,
    signature: Vec<u8>,
}

impl RegistrationData {
    /// Parses the raw (already base64-decoded) registration message.
    fn parse(data: Vec<u8>) -> Result<RegistrationData, Error> {
        let mut cursor = data;
        let magic = codec::pop_byte(&mut cursor)
            .map_err(Error::MalformedRegistrationData)?;
        if magic != 0x05 {
            return Err(Error::MalformedRegistrationData(
                "registration data has invalid magic byte",
            ));
        }
        let public_key =
            codec::pop_bytes(&mut cursor, 65).map_err(Error::MalformedRegistrationData)?;
        let key_handle_len =
            codec::pop_byte(&mut cursor).map_err(Error::MalformedRegistrationData)? as usize;
        let key_handle = codec::pop_bytes(&mut cursor, key_handle_len)
            .map_err(Error::MalformedRegistrationData)?;
        let cert_len = codec::parse_tlv_encoded_length(&cursor)
            .map_err(Error::MalformedRegistrationData)?;
        let certificate =
            codec::pop_bytes(&mut cursor, cert_len).map_err(Error::MalformedRegistrationData)?;
        let certificate = codec::fix_invalid_yubico_cert(certificate);
        let signature = cursor;

        Ok(RegistrationData {
            public_key,
            key_handle,
            certificate,
            signature,
        })
    }

    /// Verifies the attestation signature over
    /// `0x00 || app_param || challenge_param || key_handle || public_key`
    /// against the attestation certificate's public key.
    fn verify(&self, app_param: &[u8; 32], challenge_param: &[u8; 32]) -> Result<(), Error> {
        let mut message = Vec::with_capacity(1 + 32 + 32 + self.key_handle.len() + self.public_key.len());
        message.push(0x00);
        message.extend_from_slice(app_param);
        message.extend_from_slice(challenge_param);
        message.extend_from_slice(&self.key_handle);
        message.extend_from_slice(&self.public_key);

        let cert = EndEntityCert::from(Input::from(&self.certificate))
            .map_err(|_| Error::BadCertificate)?;
        cert.verify_signature(
            &ECDSA_P256_SHA256,
            Input::from(&message),
            Input::from(&self.signature),
        )
        .map_err(|_| Error::AttestationSignatureInvalid)?;

        Ok(())
    }

    /// Extracts the optional transports extension from the attestation
    /// certificate.
    fn transports(&self) -> Result<U2FTransports, Error> {
        let (_, cert) = x509_parser::parse_x509_certificate(&self.certificate)
            .map_err(|_| Error::BadCertificate)?;

        let ext = cert
            .tbs_certificate
            .extensions()
            .iter()
            .find(|ext| format!("{}", ext.oid) == TRANSPORTS_EXTENSION_OID);

        match ext {
            None => Ok(None),
            Some(ext) => {
                let value = ext.value;
                if value.len() != 4 || value[0] != 0x03 || value[1] != 0x02 {
                    return Err(Error::BadCertificate);
                }
                let unused_bits = value[2];
                let flags = (value[3] >> unused_bits) << unused_bits;
                Ok(Some(U2FTransport::from_byte(flags)))
            }
        }
    }
}

/// The parameters handed to a caller's `create_device_registration_model`
/// factory hook.
pub struct NewDeviceParams {
    pub version: String,
    pub app_id: String,
    pub key_handle: Vec<u8>,
    pub public_key: Vec<u8>,
    pub transports: U2FTransports,
}

/// Output of [`RegistrationManager::create_registration_challenge`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationChallenge {
    pub app_id: String,
    pub register_requests: Vec<RegisterRequest>,
    pub registered_keys: Vec<DeviceDescriptor>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub version: String,
    pub challenge: String,
}

/// Input to [`RegistrationManager::process_registration_response`].
#[derive(Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub version: String,
    #[serde(rename = "responseData")]
    pub response_data: String,
    #[serde(rename = "clientData")]
    pub client_data: String,
}

/// The registration ceremony manager. Holds the configured `app_id` and a
/// caller-supplied factory for persisting the resulting device; never
/// constructs or stores devices itself.
pub struct RegistrationManager<D, F>
where
    F: Fn(NewDeviceParams) -> D,
{
    app_id: String,
    factory: F,
}

impl<D, F> RegistrationManager<D, F>
where
    D: Device,
    F: Fn(NewDeviceParams) -> D,
{
    /// Creates a registration manager for `app_id`, persisting new devices
    /// through `factory`.
    pub fn new(config: &Config, factory: F) -> RegistrationManager<D, F> {
        RegistrationManager {
            app_id: config.app_id().to_owned(),
            factory,
        }
    }

    /// Generates a fresh challenge, stores it in `session`, and returns the
    /// descriptor to serialize to the browser.
    pub fn create_registration_challenge(
        &self,
        session: &mut dyn Session,
        registered_devices: &[&dyn Device],
    ) -> RegistrationChallenge {
        let challenge = codec::websafe_encode(&random_challenge());
        session.set(REGISTRATION_SESSION_KEY, challenge.clone());
        log::debug!("issued registration challenge for app_id={}", self.app_id);

        RegistrationChallenge {
            app_id: self.app_id.clone(),
            register_requests: vec![RegisterRequest {
                version: U2F_V2.to_owned(),
                challenge,
            }],
            registered_keys: registered_devices
                .iter()
                .map(|d| DeviceDescriptor::from_device(*d))
                .collect(),
        }
    }

    /// Verifies `response` against the challenge stashed in `session` and
    /// delegates persistence of the resulting device to the factory hook.
    pub fn process_registration_response(
        &self,
        session: &mut dyn Session,
        response: RegistrationResponse,
    ) -> Result<D, Error> {
        let challenge = session
            .pop(REGISTRATION_SESSION_KEY)
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingChallenge)?;

        if response.version != U2F_V2 {
            return Err(Error::UnsupportedVersion);
        }

        let registration_data = RegistrationData::parse(codec::websafe_decode(&response.response_data)?)?;

        let canonical_client_data =
            validate_client_data(&response.client_data, RequestType::Register, &self.app_id, &challenge)?;

        let challenge_param = codec::sha256(canonical_client_data.as_bytes());
        let app_param = codec::sha256(&idna_app_id(&self.app_id)?);

        if let Err(e) = registration_data.verify(&app_param, &challenge_param) {
            log::warn!("registration attestation signature failed for app_id={}", self.app_id);
            return Err(e);
        }

        let transports = registration_data.transports()?;

        log::debug!("registered new device for app_id={}", self.app_id);

        Ok((self.factory)(NewDeviceParams {
            version: response.version,
            app_id: self.app_id.clone(),
            key_handle: registration_data.key_handle,
            public_key: registration_data.public_key,
            transports,
        }))
    }
}

/// Generates 64 bytes of cryptographically secure randomness for a new
/// challenge.
fn random_challenge() -> [u8; 64] {
    use rand::RngCore;
    let mut challenge = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}

/// Encodes `app_id` to IDNA-ASCII ahead of hashing. `app_id` is hashed
/// whole, exactly as configured (a full origin such as
/// `https://example.com:8443`, not just its host) — the resulting bytes
/// feed directly into every attestation and assertion signature's signed
/// message, so they must match whatever the authenticator's counterpart
/// hashed when the credential was provisioned.
pub(crate) fn idna_app_id(app_id: &str) -> Result<Vec<u8>, Error> {
    idna::domain_to_ascii(app_id)
        .map(|s| s.into_bytes())
        .map_err(|_| Error::BadAppId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::u2f::transport::U2FTransports;
    use std::collections::BTreeMap;

    struct StubDevice {
        version: String,
        app_id: String,
        key_handle: Vec<u8>,
        public_key: Vec<u8>,
        counter: u32,
        transports: U2FTransports,
    }

    impl Device for StubDevice {
        fn version(&self) -> &str {
            &self.version
        }
        fn app_id(&self) -> &str {
            &self.app_id
        }
        fn key_handle(&self) -> &[u8] {
            &self.key_handle
        }
        fn public_key(&self) -> &[u8] {
            &self.public_key
        }
        fn counter(&self) -> u32 {
            self.counter
        }
        fn transports(&self) -> &U2FTransports {
            &self.transports
        }
    }

    #[derive(Default)]
    struct MapSession(BTreeMap<String, String>);

    impl Session for MapSession {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }
        fn set(&mut self, key: &str, value: String) {
            self.0.insert(key.to_owned(), value);
        }
        fn pop(&mut self, key: &str) -> Option<String> {
            self.0.remove(key)
        }
    }

    #[test]
    fn create_registration_challenge_stores_challenge_in_session() {
        let config = Config::new("https://example.com");
        let manager = RegistrationManager::new(&config, |params: NewDeviceParams| StubDevice {
            version: params.version,
            app_id: params.app_id,
            key_handle: params.key_handle,
            public_key: params.public_key,
            counter: 0,
            transports: params.transports,
        });
        let mut session = MapSession::default();
        let challenge = manager.create_registration_challenge(&mut session, &[]);
        assert_eq!(challenge.app_id, "https://example.com");
        assert_eq!(challenge.register_requests.len(), 1);
        assert!(session.get(REGISTRATION_SESSION_KEY).is_some());
    }

    #[test]
    fn process_registration_response_rejects_missing_challenge() {
        let config = Config::new("https://example.com");
        let manager = RegistrationManager::new(&config, |params: NewDeviceParams| StubDevice {
            version: params.version,
            app_id: params.app_id,
            key_handle: params.key_handle,
            public_key: params.public_key,
            counter: 0,
            transports: params.transports,
        });
        let mut session = MapSession::default();
        let response = RegistrationResponse {
            version: U2F_V2.to_owned(),
            response_data: String::new(),
            client_data: String::new(),
        };
        let err = manager
            .process_registration_response(&mut session, response)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::State);
    }

    #[test]
    fn process_registration_response_rejects_wrong_version() {
        let config = Config::new("https://example.com");
        let manager = RegistrationManager::new(&config, |params: NewDeviceParams| StubDevice {
            version: params.version,
            app_id: params.app_id,
            key_handle: params.key_handle,
            public_key: params.public_key,
            counter: 0,
            transports: params.transports,
        });
        let mut session = MapSession::default();
        session.set(REGISTRATION_SESSION_KEY, "chal".to_owned());
        let response = RegistrationResponse {
            version: "U2F_V1".to_owned(),
            response_data: String::new(),
            client_data: String::new(),
        };
        let err = manager
            .process_registration_response(&mut session, response)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
    }

    #[test]
    fn idna_app_id_hashes_full_origin_unchanged() {
        let app_id = "https://example.com:8443";
        let encoded = idna_app_id(app_id).unwrap();
        assert_eq!(encoded, app_id.as_bytes());
    }

    #[test]
    fn idna_app_id_distinguishes_different_origins() {
        let a = idna_app_id("https://example.com:8443").unwrap();
        let b = idna_app_id("example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn registration_data_rejects_bad_magic_byte() {
        let mut data = vec![0x06];
        data.extend(std::iter::repeat(0u8).take(65 + 1));
        let err = RegistrationData::parse(data).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
    }

    #[test]
    fn registration_data_rejects_truncated_message() {
        let data = vec![0x05, 0x04, 0x04];
        let err = RegistrationData::parse(data).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidData);
    }
}
