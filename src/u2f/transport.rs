//! U2F transport tags and their bitfield wire encoding.

use std::collections::BTreeSet;

/// A transport an authenticator can communicate over. Ordering matters for
/// the sorted `internal_name` list emitted to the browser, so this derives
/// `Ord`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum U2FTransport {
    BluetoothRadio,
    BluetoothLowEnergyRadio,
    Usb,
    Nfc,
    UsbInternal,
}

/// The full set of transports a device supports, or `None` if the
/// attestation certificate carried no transports extension at all — distinct
/// from `Some(empty set)`.
pub type U2FTransports = Option<BTreeSet<U2FTransport>>;

impl U2FTransport {
    const ALL: [U2FTransport; 5] = [
        U2FTransport::BluetoothRadio,
        U2FTransport::BluetoothLowEnergyRadio,
        U2FTransport::Usb,
        U2FTransport::Nfc,
        U2FTransport::UsbInternal,
    ];

    /// The bit this transport occupies in the wire-encoded transports byte.
    pub fn bit_value(self) -> u8 {
        match self {
            U2FTransport::BluetoothRadio => 0x80,
            U2FTransport::BluetoothLowEnergyRadio => 0x40,
            U2FTransport::Usb => 0x20,
            U2FTransport::Nfc => 0x10,
            U2FTransport::UsbInternal => 0x08,
        }
    }

    /// The name sent to the browser/JS shim in the `transports` client
    /// descriptor.
    pub fn internal_name(self) -> &'static str {
        match self {
            U2FTransport::BluetoothRadio => "br",
            U2FTransport::BluetoothLowEnergyRadio => "ble",
            U2FTransport::Usb => "usb",
            U2FTransport::Nfc => "nfc",
            U2FTransport::UsbInternal => "usb-internal",
        }
    }

    /// Returns every transport tag whose bit is set in `byte`.
    pub fn from_byte(byte: u8) -> BTreeSet<U2FTransport> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| t.bit_value() & byte != 0)
            .collect()
    }

    /// Bitwise-ORs the bit values of `transports` into a single byte.
    pub fn to_byte(transports: &BTreeSet<U2FTransport>) -> u8 {
        transports.iter().fold(0u8, |acc, t| acc | t.bit_value())
    }
}

/// Projects a [`U2FTransports`] into the JSON shape the browser expects:
/// `null` for unknown, otherwise a sorted list of internal names.
pub fn transports_to_json(transports: &U2FTransports) -> Option<Vec<&'static str>> {
    transports.as_ref().map(|set| {
        let mut names: Vec<&'static str> = set.iter().map(|t| t.internal_name()).collect();
        names.sort_unstable();
        names
    })
}

/// `RequestType` as it appears verbatim in the browser's client-data
/// envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestType {
    Register,
    Sign,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Register => "navigator.id.finishEnrollment",
            RequestType::Sign => "navigator.id.getAssertion",
        }
    }
}
