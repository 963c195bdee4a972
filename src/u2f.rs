//! Server-side core of the FIDO U2F protocol: registration and signing
//! ceremonies, built on caller-supplied [`Device`](device::Device) and
//! [`Session`](session::Session) abstractions so this crate owns no storage
//! of its own.

pub mod client_data;
pub mod codec;
pub mod device;
pub mod error;
pub mod registration;
pub mod session;
pub mod signature;
pub mod transport;

/// The single piece of configuration this crate needs: the relying party's
/// `app_id`, a full origin such as `https://example.com`. Both ceremony
/// managers are constructed from a `Config` rather than a bare string so
/// adding further options (challenge length, allowed versions) later does
/// not change either manager's constructor signature.
#[derive(Clone, Debug)]
pub struct Config {
    app_id: String,
}

impl Config {
    /// Builds a configuration for the given `app_id`.
    pub fn new(app_id: impl Into<String>) -> Config {
        Config {
            app_id: app_id.into(),
        }
    }

    /// The configured `app_id`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

pub use transport::RequestType;
