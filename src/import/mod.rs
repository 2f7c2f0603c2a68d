//! Bulk listing import from CSV exports
//!
//! Spreadsheets from agencies rarely agree on column names, separators or
//! number formats. Headers are normalized and matched against an alias table,
//! cells are coerced per field, and every row is validated with the same step
//! registry the wizard uses. Bad rows are reported, not fatal.

pub mod headers;
pub mod values;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::form::FormData;
use crate::validation::{StepRegistry, StepValidation, ValidationRules};
use crate::wizard::WizardKind;

pub use headers::{normalize_header, Field, HeaderMap, ValueKind};

/// Default upper bound on data rows read from one file
pub const DEFAULT_MAX_ROWS: usize = 5_000;

const DELIMITER_CANDIDATES: &[u8] = b",;\t";

/// Failures that abort an import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("file has no header row")]
    MissingHeader,

    #[error("no recognised columns (headers: {0})")]
    NoKnownColumns(String),
}

/// A row that produced form data
#[derive(Debug, Clone, Serialize)]
pub struct ImportedRecord {
    /// 1-indexed line number in the source file
    pub row: u64,
    pub data: FormData,
    pub validation: BTreeMap<u8, StepValidation>,
}

impl ImportedRecord {
    /// True when every wizard step would accept this record
    pub fn is_complete(&self) -> bool {
        self.validation.values().all(|v| v.valid)
    }

    /// Steps that still need input
    pub fn invalid_steps(&self) -> Vec<u8> {
        self.validation
            .iter()
            .filter(|(_, v)| !v.valid)
            .map(|(step, _)| *step)
            .collect()
    }
}

/// A row that could not be converted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub kind: WizardKind,
    pub delimiter: char,
    pub records: Vec<ImportedRecord>,
    pub errors: Vec<RowError>,
    pub unknown_headers: Vec<String>,
    /// Set when the row cap stopped the import early
    pub truncated: bool,
}

impl ImportReport {
    pub fn complete_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_complete()).count()
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub kind: WizardKind,
    /// None detects the delimiter from the header line
    pub delimiter: Option<u8>,
    pub max_rows: usize,
    pub rules: ValidationRules,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            kind: WizardKind::Property,
            delimiter: None,
            max_rows: DEFAULT_MAX_ROWS,
            rules: ValidationRules::default(),
        }
    }
}

/// Pick the candidate delimiter that occurs most often, outside quotes, in
/// the first line. Falls back to a comma.
pub fn detect_delimiter(sample: &str) -> u8 {
    let first_line = sample.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut counts = [0usize; 3];
    let mut in_quotes = false;
    for b in first_line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITER_CANDIDATES.iter().position(|c| *c == b) {
                counts[i] += 1;
            }
        }
    }

    let (best, count) = counts
        .iter()
        .enumerate()
        .max_by_key(|(i, count)| (**count, std::cmp::Reverse(*i)))
        .map(|(i, count)| (DELIMITER_CANDIDATES[i], *count))
        .unwrap_or((b',', 0));
    if count == 0 {
        b','
    } else {
        best
    }
}

pub struct CsvImporter {
    options: ImportOptions,
    registry: StepRegistry,
}

impl CsvImporter {
    pub fn new(options: ImportOptions) -> Self {
        let registry = StepRegistry::for_kind(options.kind, &options.rules);
        Self { options, registry }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn import_path(&self, path: &Path) -> Result<ImportReport, ImportError> {
        let contents = std::fs::read(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&contents);
        tracing::info!(path = %path.display(), bytes = contents.len(), "importing listings");
        self.import_str(&text)
    }

    pub fn import_str(&self, input: &str) -> Result<ImportReport, ImportError> {
        // Excel exports often start with a byte order mark
        let input = input.trim_start_matches('\u{feff}');
        let delimiter = self
            .options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(input));
        self.import_reader(input.as_bytes(), delimiter)
    }

    pub fn import_reader<R: Read>(&self, reader: R, delimiter: u8) -> Result<ImportReport, ImportError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let header_record = reader.headers()?.clone();
        if header_record.iter().all(|h| h.trim().is_empty()) {
            return Err(ImportError::MissingHeader);
        }
        let header_map = HeaderMap::from_record(&header_record);
        if header_map.known_count() == 0 {
            return Err(ImportError::NoKnownColumns(
                header_record.iter().collect::<Vec<_>>().join(", "),
            ));
        }
        if !header_map.unknown.is_empty() {
            tracing::warn!(headers = ?header_map.unknown, "ignoring unrecognised columns");
        }

        let mut report = ImportReport {
            kind: self.options.kind,
            delimiter: char::from(delimiter),
            records: Vec::new(),
            errors: Vec::new(),
            unknown_headers: header_map.unknown.clone(),
            truncated: false,
        };

        let mut record = StringRecord::new();
        let mut rows_read = 0usize;
        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(err) => {
                    let row = err.position().map_or(0, |p| p.line());
                    tracing::debug!(row, error = %err, "unreadable row");
                    report.errors.push(RowError {
                        row,
                        message: err.to_string(),
                    });
                    // Only record-level errors can be skipped
                    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                        return Err(err.into());
                    }
                    continue;
                }
            }

            if rows_read >= self.options.max_rows {
                tracing::warn!(max_rows = self.options.max_rows, "row cap reached, import truncated");
                report.truncated = true;
                break;
            }
            rows_read += 1;

            let row = record.position().map_or(rows_read as u64 + 1, |p| p.line());
            if record.iter().all(str::is_empty) {
                continue;
            }
            match self.convert_row(&header_map, &record) {
                Ok(data) => {
                    let validation = self.registry.validate_all(&data);
                    report.records.push(ImportedRecord {
                        row,
                        data,
                        validation,
                    });
                }
                Err(message) => report.errors.push(RowError { row, message }),
            }
        }

        tracing::info!(
            records = report.records.len(),
            complete = report.complete_count(),
            errors = report.errors.len(),
            truncated = report.truncated,
            "import finished"
        );
        Ok(report)
    }

    fn convert_row(&self, header_map: &HeaderMap, record: &StringRecord) -> Result<FormData, String> {
        let mut data = self.options.kind.defaults();
        let mut nested: BTreeMap<&'static str, Map<String, Value>> = BTreeMap::new();
        let mut problems = Vec::new();

        for (column, cell) in header_map.columns.iter().zip(record.iter()) {
            let Some(field) = column else { continue };
            match values::coerce(field.kind, cell) {
                Ok(Some(value)) => match field.split() {
                    (parent, Some(child)) => {
                        nested.entry(parent).or_default().insert(child.to_string(), value);
                    }
                    (name, None) => {
                        data.insert(name, value);
                    }
                },
                Ok(None) => {}
                Err(message) => problems.push(format!("{}: {message}", field.name)),
            }
        }

        if !problems.is_empty() {
            return Err(problems.join("; "));
        }

        for (parent, mut object) in nested {
            // Keep sibling defaults such as an empty street
            if let Some(Value::Object(existing)) = data.get(parent) {
                for (key, value) in existing {
                    object.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            data.insert(parent, Value::Object(object));
        }
        Ok(data)
    }
}
