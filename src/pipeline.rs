use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::args::Args;
use crate::common::delete_if_exists;
use crate::export::export_registry_csv;
use crate::jurisdiction::TargetStates;
use crate::normalize::{NormalizeOutcome, normalize_provider};
use crate::record::{DatasetEntry, load_dataset};
use crate::registry::{ProviderRegistry, RegistryLoad};

/// Counters for one pass over the dataset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub scanned: usize,
    /// Records that passed every filter, whether or not their insert added a row.
    pub processed: usize,
    pub inserted: usize,
    pub not_individual: usize,
    pub outside_target_states: usize,
    /// Passed the filters but carried no npi; counted in `processed`, never stored.
    pub missing_identifier: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlSummary {
    pub processed: u64,
    pub rows_in_table: u64,
}

impl EtlSummary {
    /// `processed - rows_in_table`. Only a true duplicate count when the table
    /// started empty; rows from earlier runs push it down, possibly below zero.
    pub fn duplicates_skipped(&self) -> i64 {
        self.processed as i64 - self.rows_in_table as i64
    }

    pub fn print(&self, db_path: &Path) {
        println!();
        println!("ETL Summary:");
        println!("   - Processed providers: {}", self.processed);
        println!("   - Loaded into DB: {}", self.rows_in_table);
        println!("   - Duplicates skipped: {}", self.duplicates_skipped());
        println!();
        println!("SQLite database '{}' ready for analysis.", db_path.display());
    }
}

pub fn load_providers(
    dataset: &[DatasetEntry],
    load: &RegistryLoad<'_>,
    targets: &TargetStates,
    progress: &ProgressBar,
) -> Result<LoadStats> {
    let mut stats = LoadStats::default();

    for (_, block) in dataset {
        for record in &block.results {
            stats.scanned += 1;
            progress.inc(1);

            match normalize_provider(record, targets) {
                NormalizeOutcome::Row(row) => {
                    if row.npi.is_none() {
                        tracing::warn!(
                            "provider record #{} has no npi number; the store will ignore it",
                            stats.scanned
                        );
                        stats.missing_identifier += 1;
                    }
                    if load.insert_if_absent(&row)? {
                        stats.inserted += 1;
                    } else {
                        tracing::debug!("npi={:?} not inserted", row.npi);
                    }
                    stats.processed += 1;
                }
                NormalizeOutcome::NotIndividual => stats.not_individual += 1,
                NormalizeOutcome::OutsideTargetStates { effective_state } => {
                    tracing::debug!("skipping provider outside target states: state={effective_state}");
                    stats.outside_target_states += 1;
                }
            }

            if stats.scanned % 1_000 == 0 {
                progress.set_message(format!(
                    "processed={} inserted={}",
                    stats.processed, stats.inserted
                ));
            }
        }
    }

    Ok(stats)
}

/// Loads `dataset` into `registry` inside a single transaction and reports the summary.
pub fn load_into_registry(
    dataset: &[DatasetEntry],
    registry: &mut ProviderRegistry,
    targets: &TargetStates,
    progress: &ProgressBar,
) -> Result<(LoadStats, EtlSummary)> {
    let load = registry.begin_load()?;
    let stats = load_providers(dataset, &load, targets, progress)?;
    load.commit()?;

    let summary = EtlSummary {
        processed: stats.processed as u64,
        rows_in_table: registry.row_count()?,
    };
    Ok((stats, summary))
}

fn record_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [load {elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        progress.set_style(style.progress_chars("=> "));
    }
    progress
}

pub fn run(args: &Args) -> Result<EtlSummary> {
    let targets = TargetStates::from_codes(&args.states)?;
    tracing::info!(
        "input={} db={} states={}",
        args.input_path.display(),
        args.db_path.display(),
        targets.codes().collect::<Vec<_>>().join(",")
    );

    tracing::info!("Step 1/3: load input dataset");
    let t0 = std::time::Instant::now();
    let dataset = load_dataset(&args.input_path)?;
    let total: usize = dataset.iter().map(|(_, block)| block.results.len()).sum();
    tracing::info!(
        "Parsed {} result blocks ({} provider records) in {:.1}s",
        dataset.len(),
        total,
        t0.elapsed().as_secs_f64()
    );

    if args.reset_db {
        delete_if_exists(&args.db_path)?;
        tracing::info!("reset_db=true (deleted {})", args.db_path.display());
    }

    tracing::info!("Step 2/3: normalize, filter, and load provider_registry");
    let mut registry = ProviderRegistry::open(&args.db_path)?;
    let progress = record_progress_bar(total);
    let (stats, summary) = load_into_registry(&dataset, &mut registry, &targets, &progress)?;
    progress.finish_with_message(format!(
        "done: processed={} inserted={}",
        stats.processed, stats.inserted
    ));
    tracing::info!(
        "scanned={} processed={} inserted={} not_individual={} outside_target_states={} missing_npi={}",
        stats.scanned,
        stats.processed,
        stats.inserted,
        stats.not_individual,
        stats.outside_target_states,
        stats.missing_identifier
    );

    if let Some(export_path) = &args.export_csv {
        tracing::info!("Step 3/3: export provider_registry to CSV");
        let written = export_registry_csv(&registry, export_path)
            .with_context(|| format!("Failed exporting {}", export_path.display()))?;
        tracing::info!("Wrote {} rows to {}", written, export_path.display());
    } else {
        tracing::info!("Step 3/3: no --export-csv given; skipping export");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_dataset;
    use std::path::PathBuf;

    const DATASET: &str = r#"[
        ["Albany, NY", {"results": [
            {
                "number": 1000000001,
                "enumeration_type": "NPI-1",
                "basic": {"first_name": "Jane", "middle_name": null, "last_name": "Doe", "credential": "MD", "gender": "F"},
                "addresses": [
                    {"address_purpose": "LOCATION", "address_1": "1 STATE ST", "city": "ALBANY", "state": "NY", "postal_code": "12207"},
                    {"address_purpose": "LOCATION", "address_1": "9 OCEAN AVE", "city": "SANTA MONICA", "state": "CA", "postal_code": "90401"},
                    {"address_purpose": "MAILING", "address_1": "PO BOX 1", "city": "ALBANY", "state": "NY", "postal_code": "12201"}
                ],
                "taxonomies": [
                    {"primary": false, "desc": "A", "license": "L-A"},
                    {"primary": true, "desc": "B", "license": "L-B"},
                    {"primary": true, "desc": "C", "license": "L-C"}
                ]
            },
            {
                "number": "1000000002",
                "enumeration_type": "NPI-2",
                "basic": {"organization_name": "ALBANY CLINIC"},
                "addresses": [{"address_purpose": "LOCATION", "state": "NY"}]
            },
            {
                "number": "1000000003",
                "enumeration_type": "NPI-1",
                "basic": {"first_name": "Sam", "last_name": "Lee"},
                "addresses": [{"address_purpose": "MAILING", "city": "AUSTIN", "state": "TX"}]
            }
        ]}],
        ["Miami, FL", {"results": [
            {
                "number": "1000000004",
                "enumeration_type": "NPI-1",
                "addresses": [{"address_purpose": "LOCATION", "state": "FL"}, {"address_purpose": "MAILING", "state": "NY"}]
            },
            {
                "number": 1000000001,
                "enumeration_type": "NPI-1",
                "basic": {"first_name": "Janet", "last_name": "Doe"},
                "addresses": [{"address_purpose": "LOCATION", "state": "TX"}]
            },
            {
                "enumeration_type": "NPI-1",
                "addresses": [{"address_purpose": "LOCATION", "state": "CA"}]
            }
        ]}]
    ]"#;

    fn targets() -> TargetStates {
        TargetStates::from_codes(["NY", "CA", "TX"]).unwrap()
    }

    fn load_fresh() -> (ProviderRegistry, LoadStats, EtlSummary) {
        let dataset = parse_dataset(DATASET).unwrap();
        let mut registry = ProviderRegistry::open_in_memory().unwrap();
        let (stats, summary) =
            load_into_registry(&dataset, &mut registry, &targets(), &ProgressBar::hidden())
                .unwrap();
        (registry, stats, summary)
    }

    #[test]
    fn filters_and_counts_records() {
        let (_, stats, summary) = load_fresh();

        assert_eq!(
            stats,
            LoadStats {
                scanned: 6,
                processed: 4,
                inserted: 2,
                not_individual: 1,
                outside_target_states: 1,
                missing_identifier: 1,
            }
        );
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.rows_in_table, 2);
        assert_eq!(summary.duplicates_skipped(), 2);
    }

    #[test]
    fn records_without_npi_count_as_processed() {
        let dataset = parse_dataset(
            r#"[["x", {"results": [
                {"enumeration_type": "NPI-1", "addresses": [{"address_purpose": "LOCATION", "state": "CA"}]},
                {"number": null, "enumeration_type": "NPI-1", "addresses": [{"address_purpose": "MAILING", "state": "NY"}]}
            ]}]]"#,
        )
        .unwrap();
        let mut registry = ProviderRegistry::open_in_memory().unwrap();
        let (stats, summary) =
            load_into_registry(&dataset, &mut registry, &targets(), &ProgressBar::hidden())
                .unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.missing_identifier, 2);
        assert_eq!(stats.inserted, 0);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.rows_in_table, 0);
    }

    #[test]
    fn numeric_postal_code_does_not_abort_the_load() {
        let dataset = parse_dataset(
            r#"[["x", {"results": [{
                "number": 1000000009,
                "enumeration_type": "NPI-1",
                "addresses": [{"address_purpose": "LOCATION", "state": "NY", "postal_code": 12207}]
            }]}]]"#,
        )
        .unwrap();
        let mut registry = ProviderRegistry::open_in_memory().unwrap();
        load_into_registry(&dataset, &mut registry, &targets(), &ProgressBar::hidden()).unwrap();

        let row = registry.get("1000000009").unwrap().unwrap();
        assert_eq!(row.location.postal_code, "12207");
    }

    #[test]
    fn stored_row_follows_precedence_rules() {
        let (registry, _, _) = load_fresh();
        let jane = registry.get("1000000001").unwrap().unwrap();

        assert_eq!(jane.location.state, "CA");
        assert_eq!(jane.location.line1, "9 OCEAN AVE");
        assert_eq!(jane.mailing.state, "NY");
        assert_eq!(jane.primary_specialty.as_deref(), Some("B"));
        assert_eq!(jane.license_number.as_deref(), Some("L-B"));
        assert_eq!(jane.full_name, "Jane Doe");
        // The later record sharing this npi was dropped, not merged.
        assert_eq!(jane.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn mailing_state_used_when_location_missing() {
        let (registry, _, _) = load_fresh();
        let sam = registry.get("1000000003").unwrap().unwrap();

        assert_eq!(sam.location.state, "Unknown");
        assert_eq!(sam.mailing.state, "TX");
        assert_eq!(sam.primary_specialty, None);
    }

    #[test]
    fn organizations_and_out_of_state_are_never_stored() {
        let (registry, _, _) = load_fresh();
        assert!(registry.get("1000000002").unwrap().is_none());
        assert!(registry.get("1000000004").unwrap().is_none());
    }

    #[test]
    fn fresh_runs_are_deterministic() {
        let collect = |registry: &ProviderRegistry| {
            let mut rows = Vec::new();
            registry
                .for_each_row(|values| {
                    rows.push(values.to_vec());
                    Ok(())
                })
                .unwrap();
            rows
        };

        let (first, _, first_summary) = load_fresh();
        let (second, _, second_summary) = load_fresh();
        assert_eq!(first_summary, second_summary);
        assert_eq!(collect(&first), collect(&second));
    }

    #[test]
    fn rerun_on_same_store_keeps_rows_and_skews_duplicate_figure() {
        let dataset = parse_dataset(DATASET).unwrap();
        let mut registry = ProviderRegistry::open_in_memory().unwrap();
        let progress = ProgressBar::hidden();

        load_into_registry(&dataset, &mut registry, &targets(), &progress).unwrap();
        let (stats, summary) =
            load_into_registry(&dataset, &mut registry, &targets(), &progress).unwrap();

        assert_eq!(stats.inserted, 0);
        assert_eq!(summary.rows_in_table, 2);
        assert_eq!(summary.duplicates_skipped(), 2);

        let smaller = parse_dataset(
            r#"[["x", {"results": [{"number": "1000000003", "enumeration_type": "NPI-1",
                "addresses": [{"address_purpose": "MAILING", "state": "TX"}]}]}]]"#,
        )
        .unwrap();
        let (_, summary) = load_into_registry(&smaller, &mut registry, &targets(), &progress).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.duplicates_skipped(), -1);
    }

    fn args_for(dir: &Path) -> Args {
        Args {
            input_path: dir.join("Dataset.json"),
            db_path: dir.join("providers.db"),
            states: vec!["NY".to_string(), "CA".to_string(), "TX".to_string()],
            reset_db: false,
            export_csv: None,
        }
    }

    #[test]
    fn run_loads_file_and_exports_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dataset.json"), DATASET).unwrap();
        let export_path: PathBuf = dir.path().join("registry.csv");

        let args = Args {
            export_csv: Some(export_path.clone()),
            ..args_for(dir.path())
        };
        let summary = run(&args).unwrap();
        assert_eq!(summary.rows_in_table, 2);

        let exported = std::fs::read_to_string(&export_path).unwrap();
        assert_eq!(exported.lines().count(), 3);
        assert!(exported.starts_with("npi,enumeration_type,"));
    }

    #[test]
    fn reset_db_starts_from_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dataset.json"), DATASET).unwrap();

        run(&args_for(dir.path())).unwrap();
        let summary = run(&Args {
            reset_db: true,
            ..args_for(dir.path())
        })
        .unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.rows_in_table, 2);
    }

    #[test]
    fn reset_db_keeps_store_when_input_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dataset.json"), DATASET).unwrap();
        run(&args_for(dir.path())).unwrap();

        std::fs::write(dir.path().join("Dataset.json"), "[[\"x\", ").unwrap();
        let reset = Args {
            reset_db: true,
            ..args_for(dir.path())
        };
        assert!(run(&reset).is_err());
        assert!(dir.path().join("providers.db").exists());

        let registry = ProviderRegistry::open(&dir.path().join("providers.db")).unwrap();
        assert_eq!(registry.row_count().unwrap(), 2);
    }

    #[test]
    fn malformed_input_fails_without_creating_rows() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dataset.json"), "{\"not\": \"an array\"}").unwrap();

        let err = run(&args_for(dir.path())).unwrap_err();
        assert!(format!("{err:#}").contains("Failed parsing input dataset"));
        assert!(!dir.path().join("providers.db").exists());
    }
}
