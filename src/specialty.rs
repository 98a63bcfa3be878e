use crate::record::RawTaxonomy;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimarySpecialty {
    pub description: Option<String>,
    pub license_number: Option<String>,
}

/// First taxonomy flagged `primary: true`. Unlike addresses, the earliest match wins.
pub fn primary_specialty(taxonomies: &[RawTaxonomy]) -> Option<&RawTaxonomy> {
    taxonomies.iter().find(|t| t.is_primary())
}

/// Description and license of the primary taxonomy, both `None` when there is none.
pub fn specialty_fields(taxonomies: &[RawTaxonomy]) -> PrimarySpecialty {
    match primary_specialty(taxonomies) {
        Some(tax) => PrimarySpecialty {
            description: tax.desc.clone(),
            license_number: tax.license.clone(),
        },
        None => PrimarySpecialty::default(),
    }
}
