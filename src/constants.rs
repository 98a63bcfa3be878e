pub const DEFAULT_INPUT_PATH: &str = "Dataset.json";
pub const DEFAULT_DB_PATH: &str = "providers.db";
pub const DEFAULT_TARGET_STATES: &str = "NY,CA,TX";

/// Placeholder stored for address fields missing from the source record.
pub const UNKNOWN: &str = "Unknown";

pub const INDIVIDUAL_ENUMERATION_TYPE: &str = "NPI-1";
pub const ORGANIZATION_ENUMERATION_TYPE: &str = "NPI-2";
