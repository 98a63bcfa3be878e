use anyhow::{Result, bail};
use std::collections::BTreeSet;

use crate::address::NormalizedAddress;
use crate::constants::UNKNOWN;

#[derive(Debug, Clone)]
pub struct TargetStates {
    states: BTreeSet<String>,
}

impl TargetStates {
    pub fn from_codes<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let states: BTreeSet<String> = codes
            .into_iter()
            .map(|code| code.as_ref().trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
        if states.is_empty() {
            bail!("At least one target state is required");
        }
        Ok(Self { states })
    }

    pub fn contains(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// Location state, or mailing state when the location state is unknown.
    pub fn effective_state<'a>(
        location: &'a NormalizedAddress,
        mailing: &'a NormalizedAddress,
    ) -> &'a str {
        if location.has_known_state() {
            &location.state
        } else {
            &mailing.state
        }
    }

    pub fn admits(&self, location: &NormalizedAddress, mailing: &NormalizedAddress) -> bool {
        let state = Self::effective_state(location, mailing);
        state != UNKNOWN && self.contains(state)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(String::as_str)
    }
}
