//! Controller identity and identifier-space ownership.

use std::fmt;

/// Width in bits of a controller address.
pub const ADDRESS_BITS: u32 = 40;

/// Low-order bits of a network identifier holding the per-controller
/// network number; the remaining high-order bits are the controller address.
pub const NETWORK_NUMBER_BITS: u32 = 24;

/// The address of a configuration controller.
///
/// Every network identifier embeds its owning controller's address in its
/// high-order bits. The sync engine uses this to scope remote queries and to
/// reject pulled records belonging to other controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Creates a controller identity from a raw address, masking it to
    /// [`ADDRESS_BITS`] bits.
    pub fn new(address: u64) -> Self {
        Self(address & ((1u64 << ADDRESS_BITS) - 1))
    }

    /// Returns the raw address value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true if the given network identifier belongs to this
    /// controller's identifier space.
    pub fn owns(&self, network_id: u64) -> bool {
        (network_id >> NETWORK_NUMBER_BITS) == self.0
    }

    /// Composes a full network identifier from a per-controller network
    /// number.
    pub fn network_id(&self, network_number: u64) -> u64 {
        (self.0 << NETWORK_NUMBER_BITS) | (network_number & ((1u64 << NETWORK_NUMBER_BITS) - 1))
    }

    /// Renders the address as its canonical 10-digit lowercase hex form.
    pub fn to_hex(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010x}", self.0)
    }
}
