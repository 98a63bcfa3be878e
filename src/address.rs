use crate::constants::UNKNOWN;
use crate::record::RawAddress;

pub const LOCATION_PURPOSE: &str = "LOCATION";
pub const MAILING_PURPOSE: &str = "MAILING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Default for NormalizedAddress {
    fn default() -> Self {
        Self {
            line1: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            state: UNKNOWN.to_string(),
            postal_code: UNKNOWN.to_string(),
        }
    }
}

impl NormalizedAddress {
    fn from_raw(raw: &RawAddress) -> Self {
        Self {
            line1: or_unknown(raw.address_1.as_deref()),
            city: or_unknown(raw.city.as_deref()),
            state: or_unknown(raw.state.as_deref()),
            postal_code: or_unknown(raw.postal_code.as_deref()),
        }
    }

    pub fn has_known_state(&self) -> bool {
        self.state != UNKNOWN
    }
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).to_string()
}

/// Returns `(location, mailing)`. A later entry with the same purpose replaces
/// an earlier one.
pub fn extract_addresses(addresses: &[RawAddress]) -> (NormalizedAddress, NormalizedAddress) {
    let mut location = NormalizedAddress::default();
    let mut mailing = NormalizedAddress::default();

    for addr in addresses {
        match addr.address_purpose.as_deref() {
            Some(LOCATION_PURPOSE) => location = NormalizedAddress::from_raw(addr),
            Some(MAILING_PURPOSE) => mailing = NormalizedAddress::from_raw(addr),
            _ => {}
        }
    }

    (location, mailing)
}
