//! Server-side core of the FIDO U2F (Universal 2nd Factor) protocol.

pub mod u2f;

pub use crate::u2f::{
    device::{Device, DeviceDescriptor},
    error::{Error, ErrorKind},
    registration::{NewDeviceParams, RegisterRequest, RegistrationChallenge, RegistrationManager, RegistrationResponse},
    session::{MemorySession, Session},
    signature::{SigningChallenge, SigningManager, SigningResponse},
    transport::{U2FTransport, U2FTransports},
    Config, RequestType,
};
