use anyhow::{Context, Result};
use csv::Writer;
use std::{fs, path::Path};

use crate::registry::{ProviderRegistry, REGISTRY_COLUMNS};

/// Writes the whole table to a `.tmp` sibling of `output_path`, then renames it into place.
pub fn export_registry_csv(registry: &ProviderRegistry, output_path: &Path) -> Result<u64> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "Failed creating export parent directory {}",
                parent.display()
            )
        })?;
    }

    let file_name = output_path
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("provider_registry.csv");
    let tmp_path = output_path.with_file_name(format!("{file_name}.tmp"));

    let mut writer = Writer::from_path(&tmp_path)
        .with_context(|| format!("Failed creating temp export CSV {}", tmp_path.display()))?;
    writer
        .write_record(REGISTRY_COLUMNS)
        .context("Failed writing export CSV header")?;

    let mut written = 0u64;
    registry.for_each_row(|values| {
        writer
            .write_record(values.iter().map(|v| v.as_deref().unwrap_or("")))
            .context("Failed writing export CSV row")?;
        written += 1;
        Ok(())
    })?;
    writer.flush().context("Failed flushing export CSV writer")?;
    drop(writer);

    fs::rename(&tmp_path, output_path).with_context(|| {
        format!(
            "Failed moving temp export {} to {}",
            tmp_path.display(),
            output_path.display()
        )
    })?;
    Ok(written)
}
