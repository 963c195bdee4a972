//! Signature (assertion) response parsing/verification and the signing
//! ceremony manager.

use crate::u2f::{
    client_data::validate_client_data,
    codec,
    device::{Device, DeviceDescriptor},
    error::Error,
    registration::idna_app_id,
    session::Session,
    transport::RequestType,
    Config,
};
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use serde::{Deserialize, Serialize};

const SIGNING_SESSION_KEY: &str = "u2f_signing_challenge";

/// The raw assertion message, parsed into its component fields.
struct SignatureData {
    user_presence: u8,
    counter: u32,
    signature: Vec<u8>,
}

impl SignatureData {
    fn parse(data: Vec<u8>) -> Result<SignatureData, Error> {
        let mut cursor = data;
        let user_presence =
            codec::pop_byte(&mut cursor).map_err(Error::MalformedSignatureData)?;
        let counter_bytes =
            codec::pop_bytes(&mut cursor, 4).map_err(Error::MalformedSignatureData)?;
        let counter = u32::from_be_bytes([
            counter_bytes[0],
            counter_bytes[1],
            counter_bytes[2],
            counter_bytes[3],
        ]);
        let signature = cursor;

        Ok(SignatureData {
            user_presence,
            counter,
            signature,
        })
    }

    /// Verifies the assertion signature over
    /// `app_param || user_presence || counter || challenge_param` against
    /// `device_public_key`.
    fn verify(
        &self,
        device_public_key: &[u8],
        app_param: &[u8; 32],
        challenge_param: &[u8; 32],
    ) -> Result<(), Error> {
        let mut message = Vec::with_capacity(32 + 1 + 4 + 32);
        message.extend_from_slice(app_param);
        message.push(self.user_presence);
        message.extend_from_slice(&self.counter.to_be_bytes());
        message.extend_from_slice(challenge_param);

        let key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, device_public_key);
        key.verify(&message, &self.signature)
            .map_err(|_| Error::AssertionSignatureInvalid)
    }
}

/// Output of [`SigningManager::create_signing_challenge`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningChallenge {
    pub app_id: String,
    pub challenge: String,
    pub registered_keys: Vec<DeviceDescriptor>,
}

/// Input to [`SigningManager::process_signing_response`].
#[derive(Deserialize)]
pub struct SigningResponse {
    #[serde(rename = "keyHandle")]
    pub key_handle: String,
    #[serde(rename = "signatureData")]
    pub signature_data: String,
    #[serde(rename = "clientData")]
    pub client_data: String,
}

/// The signing (assertion) ceremony manager. Holds the configured `app_id`
/// and a caller-supplied hook for persisting the new counter value after a
/// successful verification; never mutates a device itself.
pub struct SigningManager<F>
where
    F: Fn(&dyn Device, u32),
{
    app_id: String,
    on_counter_update: F,
}

impl<F> SigningManager<F>
where
    F: Fn(&dyn Device, u32),
{
    /// Creates a signing manager for `app_id`, persisting counter updates
    /// through `on_counter_update`.
    pub fn new(config: &Config, on_counter_update: F) -> SigningManager<F> {
        SigningManager {
            app_id: config.app_id().to_owned(),
            on_counter_update,
        }
    }

    /// Generates a fresh challenge against the devices eligible for this
    /// `app_id`, stores it in `session`, and returns the descriptor to
    /// serialize to the browser. Fails with [`Error::NoEligibleDevices`] if
    /// none of `devices` are registered under this `app_id`.
    pub fn create_signing_challenge(
        &self,
        session: &mut dyn Session,
        devices: &[&dyn Device],
    ) -> Result<SigningChallenge, Error> {
        let eligible: Vec<&&dyn Device> =
            devices.iter().filter(|d| d.app_id() == self.app_id).collect();
        if eligible.is_empty() {
            return Err(Error::NoEligibleDevices);
        }

        let challenge = codec::websafe_encode(&random_challenge());
        session.set(SIGNING_SESSION_KEY, challenge.clone());
        log::debug!("issued signing challenge for app_id={}", self.app_id);

        Ok(SigningChallenge {
            app_id: self.app_id.clone(),
            challenge,
            registered_keys: eligible
                .iter()
                .map(|d| DeviceDescriptor::from_device(**d))
                .collect(),
        })
    }

    /// Verifies `response` against the challenge stashed in `session` and one
    /// of `devices`, enforcing the anti-cloning counter invariant before
    /// persisting the new counter through `on_counter_update`.
    ///
    /// The challenge is read, not popped: a signing challenge may legitimately
    /// be presented to more than one eligible device in sequence (see
    /// DESIGN.md for the reasoning).
    pub fn process_signing_response(
        &self,
        session: &mut dyn Session,
        response: SigningResponse,
        devices: &[&dyn Device],
    ) -> Result<(), Error> {
        let challenge = session
            .get(SIGNING_SESSION_KEY)
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingChallenge)?;

        let key_handle = codec::websafe_decode(&response.key_handle)?;
        let device = devices
            .iter()
            .find(|d| d.app_id() == self.app_id && d.key_handle() == key_handle.as_slice())
            .ok_or(Error::UnknownKeyHandle)?;

        let canonical_client_data =
            validate_client_data(&response.client_data, RequestType::Sign, &self.app_id, &challenge)?;

        let challenge_param = codec::sha256(canonical_client_data.as_bytes());
        let app_param = codec::sha256(&idna_app_id(&self.app_id)?);

        let signature_data = SignatureData::parse(codec::websafe_decode(&response.signature_data)?)?;

        if let Err(e) = signature_data.verify(device.public_key(), &app_param, &challenge_param) {
            log::warn!("assertion signature failed for app_id={}", self.app_id);
            return Err(e);
        }

        if signature_data.counter <= device.counter() {
            log::warn!(
                "counter regression for app_id={} (stored={}, received={})",
                self.app_id,
                device.counter(),
                signature_data.counter
            );
            return Err(Error::CounterRegression);
        }

        (self.on_counter_update)(*device, signature_data.counter);
        log::debug!("advanced counter to {} for app_id={}", signature_data.counter, self.app_id);

        Ok(())
    }
}

fn random_challenge() -> [u8; 64] {
    use rand::RngCore;
    let mut challenge = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}
