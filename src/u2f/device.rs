//! The device-record abstraction: the library never constructs or stores
//! devices, it only describes the six read-only capabilities a caller's
//! persistence layer must expose, plus the JSON projection sent to the
//! browser.

use crate::u2f::{codec, transport::U2FTransports};
use serde::Serialize;

/// A previously-registered U2F security key, as the caller's persistence
/// layer represents it. The library only ever reads through this interface;
/// construction and storage belong entirely to the caller, via the
/// `create_device_registration_model` / `update_device_registration_counter`
/// hooks the two ceremony managers invoke.
pub trait Device {
    /// Always `"U2F_V2"` for devices registered by this library.
    fn version(&self) -> &str;

    /// The `app_id` this device was registered against.
    fn app_id(&self) -> &str;

    /// The authenticator-chosen opaque key handle.
    fn key_handle(&self) -> &[u8];

    /// The raw 65-byte SEC1 uncompressed P-256 public key.
    fn public_key(&self) -> &[u8];

    /// The last-seen monotonic signature counter.
    fn counter(&self) -> u32;

    /// The transports this device supports, or `None` if unknown.
    fn transports(&self) -> &U2FTransports;
}

/// The JSON shape sent to the browser for a registered device: used in
/// `registeredKeys` during challenge creation and nowhere else — the
/// library never re-serializes a full device record.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub version: String,
    pub app_id: String,
    pub key_handle: String,
    pub transports: Option<Vec<&'static str>>,
}

impl DeviceDescriptor {
    /// Projects a device into its client-facing descriptor.
    pub fn from_device(device: &dyn Device) -> DeviceDescriptor {
        DeviceDescriptor {
            version: device.version().to_owned(),
            app_id: device.app_id().to_owned(),
            key_handle: codec::websafe_encode(device.key_handle()),
            transports: crate::u2f::transport::transports_to_json(device.transports()),
        }
    }
}
