use crate::address::{NormalizedAddress, extract_addresses};
use crate::constants::INDIVIDUAL_ENUMERATION_TYPE;
use crate::jurisdiction::TargetStates;
use crate::record::{EnumerationType, RawProviderRecord};
use crate::specialty::specialty_fields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRow {
    /// `None` when the source record has no npi; the store ignores such rows.
    pub npi: Option<String>,
    pub enumeration_type: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub credential: Option<String>,
    pub gender: Option<String>,
    pub primary_specialty: Option<String>,
    pub license_number: Option<String>,
    pub location: NormalizedAddress,
    pub mailing: NormalizedAddress,
}

#[derive(Debug)]
pub enum NormalizeOutcome {
    Row(Box<ProviderRow>),
    NotIndividual,
    OutsideTargetStates { effective_state: String },
}

/// Space-joins the non-empty name parts in order.
pub fn compose_full_name(parts: [Option<&str>; 3]) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_provider(record: &RawProviderRecord, targets: &TargetStates) -> NormalizeOutcome {
    if record.enumeration() != EnumerationType::Individual {
        return NormalizeOutcome::NotIndividual;
    }

    let (location, mailing) = extract_addresses(record.addresses());
    if !targets.admits(&location, &mailing) {
        return NormalizeOutcome::OutsideTargetStates {
            effective_state: TargetStates::effective_state(&location, &mailing).to_string(),
        };
    }

    let basic = record.basic.as_ref();
    let first_name = basic.and_then(|b| b.first_name.clone());
    let middle_name = basic.and_then(|b| b.middle_name.clone());
    let last_name = basic.and_then(|b| b.last_name.clone());
    let full_name = compose_full_name([
        first_name.as_deref(),
        middle_name.as_deref(),
        last_name.as_deref(),
    ]);
    let specialty = specialty_fields(record.taxonomies());

    NormalizeOutcome::Row(Box::new(ProviderRow {
        npi: record.identifier(),
        enumeration_type: INDIVIDUAL_ENUMERATION_TYPE.to_string(),
        first_name,
        middle_name,
        last_name,
        full_name,
        credential: basic.and_then(|b| b.credential.clone()),
        gender: basic.and_then(|b| b.gender.clone()),
        primary_specialty: specialty.description,
        license_number: specialty.license_number,
        location,
        mailing,
    }))
}
