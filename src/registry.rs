use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};
use std::{fs, path::Path};

use crate::normalize::ProviderRow;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS provider_registry (
        npi TEXT PRIMARY KEY NOT NULL,
        enumeration_type TEXT,
        first_name TEXT,
        middle_name TEXT,
        last_name TEXT,
        full_name TEXT,
        credential TEXT,
        gender TEXT,
        primary_specialty TEXT,
        license_number TEXT,
        location_address_line1 TEXT,
        location_city TEXT,
        location_state TEXT,
        location_postal_code TEXT,
        mailing_address_line1 TEXT,
        mailing_city TEXT,
        mailing_state TEXT,
        mailing_postal_code TEXT
    );
";

const INSERT_OR_IGNORE_SQL: &str = "
    INSERT OR IGNORE INTO provider_registry (
        npi, enumeration_type, first_name, middle_name, last_name, full_name,
        credential, gender, primary_specialty, license_number,
        location_address_line1, location_city, location_state, location_postal_code,
        mailing_address_line1, mailing_city, mailing_state, mailing_postal_code
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
";

pub const REGISTRY_COLUMNS: [&str; 18] = [
    "npi",
    "enumeration_type",
    "first_name",
    "middle_name",
    "last_name",
    "full_name",
    "credential",
    "gender",
    "primary_specialty",
    "license_number",
    "location_address_line1",
    "location_city",
    "location_state",
    "location_postal_code",
    "mailing_address_line1",
    "mailing_city",
    "mailing_state",
    "mailing_postal_code",
];

pub struct ProviderRegistry {
    conn: Connection,
}

/// Open transaction on the registry. Dropping it without `commit` rolls back.
pub struct RegistryLoad<'a> {
    tx: Transaction<'a>,
}

impl ProviderRegistry {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed creating database dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed opening provider DB {}", path.display()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed opening in-memory provider DB")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)
            .context("Failed initializing provider_registry schema")?;
        Ok(Self { conn })
    }

    pub fn begin_load(&mut self) -> Result<RegistryLoad<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed beginning provider load transaction")?;
        Ok(RegistryLoad { tx })
    }

    pub fn row_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM provider_registry", [], |row| {
                row.get(0)
            })
            .context("Failed counting provider_registry rows")?;
        Ok(count as u64)
    }

    /// Every stored row as text, ordered by npi, in `REGISTRY_COLUMNS` order.
    pub fn for_each_row<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[Option<String>]) -> Result<()>,
    {
        let query = format!(
            "SELECT {} FROM provider_registry ORDER BY npi",
            REGISTRY_COLUMNS.join(", ")
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .context("Failed preparing provider_registry export query")?;
        let mut rows = stmt
            .query([])
            .context("Failed querying provider_registry rows")?;

        let mut values = Vec::with_capacity(REGISTRY_COLUMNS.len());
        while let Some(row) = rows.next().context("Failed iterating provider_registry rows")? {
            values.clear();
            for (idx, column) in REGISTRY_COLUMNS.iter().enumerate() {
                let value: Option<String> = row
                    .get(idx)
                    .with_context(|| format!("Failed reading {column}"))?;
                values.push(value);
            }
            f(&values)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, npi: &str) -> Result<Option<ProviderRow>> {
        use crate::address::NormalizedAddress;
        use rusqlite::OptionalExtension;

        let query = format!(
            "SELECT {} FROM provider_registry WHERE npi = ?1",
            REGISTRY_COLUMNS.join(", ")
        );
        self.conn
            .query_row(&query, [npi], |row| {
                Ok(ProviderRow {
                    npi: row.get(0)?,
                    enumeration_type: row.get(1)?,
                    first_name: row.get(2)?,
                    middle_name: row.get(3)?,
                    last_name: row.get(4)?,
                    full_name: row.get(5)?,
                    credential: row.get(6)?,
                    gender: row.get(7)?,
                    primary_specialty: row.get(8)?,
                    license_number: row.get(9)?,
                    location: NormalizedAddress {
                        line1: row.get(10)?,
                        city: row.get(11)?,
                        state: row.get(12)?,
                        postal_code: row.get(13)?,
                    },
                    mailing: NormalizedAddress {
                        line1: row.get(14)?,
                        city: row.get(15)?,
                        state: row.get(16)?,
                        postal_code: row.get(17)?,
                    },
                })
            })
            .optional()
            .with_context(|| format!("Failed reading provider {npi}"))
    }
}

impl RegistryLoad<'_> {
    /// Returns true when a new row was written, false when the npi already
    /// existed or was missing.
    pub fn insert_if_absent(&self, row: &ProviderRow) -> Result<bool> {
        let mut stmt = self
            .tx
            .prepare_cached(INSERT_OR_IGNORE_SQL)
            .context("Failed preparing provider insert statement")?;
        let changed = stmt
            .execute(params![
                row.npi,
                row.enumeration_type,
                row.first_name,
                row.middle_name,
                row.last_name,
                row.full_name,
                row.credential,
                row.gender,
                row.primary_specialty,
                row.license_number,
                row.location.line1,
                row.location.city,
                row.location.state,
                row.location.postal_code,
                row.mailing.line1,
                row.mailing.city,
                row.mailing.state,
                row.mailing.postal_code,
            ])
            .with_context(|| {
                format!(
                    "Failed inserting provider {}",
                    row.npi.as_deref().unwrap_or("<no npi>")
                )
            })?;
        Ok(changed > 0)
    }

    pub fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .context("Failed committing provider load transaction")
    }
}
