//! CSV store: one `{dir}/{SYMBOL}.csv` file per symbol with `date,close` rows.
//!
//! `download` writes here; the store then serves as an offline provider.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{within_range, DataError, DataProvider, DataSource};
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for a symbol: `{dir}/{SYMBOL}.csv`.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.path_for(symbol).is_file()
    }

    /// Write a series, replacing any existing file.
    ///
    /// Writes to `{SYMBOL}.csv.tmp` first and renames into place.
    pub fn write(&self, symbol: &str, bars: &[PriceBar]) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(symbol);
        let tmp = path.with_extension("csv.tmp");

        let mut wtr = csv::Writer::from_path(&tmp)?;
        for bar in bars {
            wtr.serialize(bar)?;
        }
        wtr.flush()?;
        drop(wtr);

        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Load the full stored series for a symbol.
    pub fn load(&self, symbol: &str) -> Result<Vec<PriceBar>, DataError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(DataError::NoStoredData {
                symbol: symbol.to_string(),
            });
        }
        Self::read_file(&path)
    }

    /// Read any `date,close` CSV file.
    pub fn read_file(path: &Path) -> Result<Vec<PriceBar>, DataError> {
        let mut rdr = csv::Reader::from_path(path)?;
        rdr.deserialize()
            .map(|row| row.map_err(DataError::from))
            .collect()
    }

    /// Symbols with a stored file, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut symbols: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

impl DataProvider for CsvStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::Csv
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError> {
        Ok(within_range(self.load(symbol)?, start, end))
    }
}
