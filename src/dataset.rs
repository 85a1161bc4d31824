use std::{fs::File, path::Path};

use crate::error::LoadError;
use crate::types::HouseRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded,
    Failed(String),
}

/// Read-only historical records, loaded once per context.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    records: Vec<HouseRecord>,
    status: LoadStatus,
}

impl DatasetStore {
    /// Loads the CSV at `path`. A failed load still yields a store, empty and
    /// marked `Failed`, so callers can tell "no data" apart from "zero rows".
    pub fn open(path: &Path) -> Self {
        match load(path) {
            Ok(records) => {
                tracing::info!("loaded {} house records from {}", records.len(), path.display());
                Self {
                    records,
                    status: LoadStatus::Loaded,
                }
            }
            Err(e) => {
                tracing::error!("error loading house data: {}", e);
                Self::failed(e.to_string())
            }
        }
    }

    pub fn from_records(records: Vec<HouseRecord>) -> Self {
        Self {
            records,
            status: LoadStatus::Loaded,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            status: LoadStatus::Failed(reason.into()),
        }
    }

    pub fn records(&self) -> &[HouseRecord] {
        &self.records
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load(path: &Path) -> Result<Vec<HouseRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for row in reader.deserialize::<HouseRecord>() {
        let record = row.map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        // header is line 1
        check_record(&record, records.len() as u64 + 2)?;
        records.push(record);
    }
    Ok(records)
}

fn check_record(r: &HouseRecord, line: u64) -> Result<(), LoadError> {
    let reason = if !(r.price.is_finite() && r.price > 0.0) {
        "price must be a positive number"
    } else if r.sqft == 0 {
        "sqft must be positive"
    } else if r.bedrooms == 0 {
        "bed must be positive"
    } else if !(r.bathrooms.is_finite() && r.bathrooms > 0.0) {
        "bath must be a positive number"
    } else {
        return Ok(());
    };
    Err(LoadError::InvalidRecord {
        line,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_socal_columns() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "image_id,street,citi,n_citi,bed,bath,sqft,price").expect("write header");
        writeln!(file, "0,1317 Van Buren Avenue,\"Salton City, CA\",317,3,2.0,1560,201900")
            .expect("write row");
        writeln!(file, "1,124 C Street W,\"Brawley, CA\",48,3,2.5,713,228500").expect("write row");

        let store = DatasetStore::open(file.path());

        assert!(store.is_loaded());
        assert_eq!(store.len(), 2);
        let first = &store.records()[0];
        assert_eq!(first.city, "Salton City, CA");
        assert_eq!(first.sqft, 1560);
        assert_eq!(first.bedrooms, 3);
        assert_eq!(first.bathrooms, 2.0);
        assert_eq!(first.price, 201900.0);
    }

    #[test]
    fn accepts_city_header_alias() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "city,bed,bath,sqft,price").expect("write header");
        writeln!(file, "X,2,1,900,300000").expect("write row");

        let records = load(file.path()).expect("load csv");
        assert_eq!(records[0].city, "X");
    }

    #[test]
    fn missing_file_yields_empty_failed_store() {
        let store = DatasetStore::open(Path::new("/nonexistent/socal2.csv"));
        assert!(!store.is_loaded());
        assert!(store.is_empty());
        assert!(matches!(store.status(), LoadStatus::Failed(_)));
    }

    #[test]
    fn malformed_row_fails_whole_load() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "citi,bed,bath,sqft,price").expect("write header");
        writeln!(file, "X,2,1,900,300000").expect("write row");
        writeln!(file, "X,two,1,900,300000").expect("write row");

        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Csv { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn non_positive_values_rejected() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "citi,bed,bath,sqft,price").expect("write header");
        writeln!(file, "X,2,1,0,300000").expect("write row");

        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { line: 2, .. }), "{err:?}");
    }
}
