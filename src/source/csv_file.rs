//! CSV Well Table Source
//!
//! Reads a CSV export of the analog well table. Columns are located by
//! header name (case-insensitive), so column order does not matter:
//!
//! | column                    | required |
//! |---------------------------|----------|
//! | `API10`                   | yes      |
//! | `API14`                   | no       |
//! | `tcaID`                   | no       |
//! | `wellStatus`              | yes      |
//! | `OperatorGold`            | no       |
//! | `CompletionYear`          | yes      |
//! | `LateralLength_FT`        | yes      |
//! | `Proppant_LBSPerFT`       | yes      |
//! | `Fluid_BBLPerFT`          | yes      |
//! | `SpacingHzAnyZoneAtDrill` | yes      |
//! | `BoundingAnyZoneAtDrill`  | no       |
//! | `BasinQuantum`            | yes      |
//! | `flowUnit_Analog`         | yes      |
//!
//! Empty cells are read as missing. Numeric cells are kept as text. Each
//! record is a single line; quoted fields may not span lines.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{matches_status_and_year, DataRetrievalError, LocatedRow, WellDataSource, WellQuery};
use crate::types::RawWellRow;

/// Header written by [`CsvWellSource::header_line`]
pub const CSV_COLUMNS: [&str; 13] = [
    "API10",
    "API14",
    "tcaID",
    "wellStatus",
    "OperatorGold",
    "CompletionYear",
    "LateralLength_FT",
    "Proppant_LBSPerFT",
    "Fluid_BBLPerFT",
    "SpacingHzAnyZoneAtDrill",
    "BoundingAnyZoneAtDrill",
    "BasinQuantum",
    "flowUnit_Analog",
];

// ============================================================================
// CSV Quote-Aware Parsing
// ============================================================================

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Quote a field when it contains a separator or quote.
///
/// Line breaks become spaces so every record stays on one line.
fn csv_escape(field: &str) -> String {
    let field = field.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if field.contains([',', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

// ============================================================================
// Column Mapping
// ============================================================================

/// Column indices resolved from the header row
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    api10: usize,
    api14: Option<usize>,
    group_id: Option<usize>,
    well_status: usize,
    operator: Option<usize>,
    completion_year: usize,
    lateral_length: usize,
    proppant: usize,
    fluid: usize,
    spacing: usize,
    boundary: Option<usize>,
    basin: usize,
    flow_unit: usize,
}

impl ColumnMap {
    fn from_header(header: &str) -> Result<Self, DataRetrievalError> {
        let columns: Vec<String> = csv_split(header.trim_start_matches('\u{feff}'))
            .into_iter()
            .map(|c| c.trim().to_lowercase())
            .collect();

        let find = |name: &str| columns.iter().position(|c| *c == name.to_lowercase());
        let require = |name: &str| {
            find(name).ok_or_else(|| DataRetrievalError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            api10: require("API10")?,
            api14: find("API14"),
            group_id: find("tcaID"),
            well_status: require("wellStatus")?,
            operator: find("OperatorGold"),
            completion_year: require("CompletionYear")?,
            lateral_length: require("LateralLength_FT")?,
            proppant: require("Proppant_LBSPerFT")?,
            fluid: require("Fluid_BBLPerFT")?,
            spacing: require("SpacingHzAnyZoneAtDrill")?,
            boundary: find("BoundingAnyZoneAtDrill"),
            basin: require("BasinQuantum")?,
            flow_unit: require("flowUnit_Analog")?,
        })
    }

    fn parse_row(&self, fields: &[String]) -> LocatedRow {
        let cell = |idx: usize| {
            fields
                .get(idx)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let opt_cell = |idx: Option<usize>| idx.and_then(cell);

        LocatedRow {
            basin: cell(self.basin).unwrap_or_default(),
            flow_unit: cell(self.flow_unit).unwrap_or_default(),
            row: RawWellRow {
                api10: cell(self.api10),
                api14: opt_cell(self.api14),
                group_id: opt_cell(self.group_id),
                well_status: cell(self.well_status),
                operator: opt_cell(self.operator),
                completion_year: cell(self.completion_year),
                lateral_length_ft: cell(self.lateral_length),
                proppant_lbs_per_ft: cell(self.proppant),
                fluid_bbl_per_ft: cell(self.fluid),
                spacing_ft: cell(self.spacing),
                boundary_category: opt_cell(self.boundary),
            },
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Well rows read from a CSV file on every fetch.
#[derive(Debug, Clone)]
pub struct CsvWellSource {
    path: PathBuf,
}

impl CsvWellSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row of the file, regardless of basin or status.
    pub fn read_all(&self) -> Result<Vec<LocatedRow>, DataRetrievalError> {
        let file =
            File::open(&self.path).map_err(|e| DataRetrievalError::Io(self.path.clone(), e))?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .ok_or_else(|| {
                DataRetrievalError::Format(format!("empty file: {}", self.path.display()))
            })?
            .map_err(|e| DataRetrievalError::Io(self.path.clone(), e))?;
        let map = ColumnMap::from_header(&header)?;

        let mut rows = Vec::new();
        for line in lines {
            let line = line.map_err(|e| DataRetrievalError::Io(self.path.clone(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(map.parse_row(&csv_split(&line)));
        }

        tracing::debug!(file = %self.path.display(), rows = rows.len(), "Read well table");
        Ok(rows)
    }

    /// Header line matching [`Self::format_row`]
    pub fn header_line() -> String {
        CSV_COLUMNS.join(",")
    }

    /// One CSV line in [`CSV_COLUMNS`] order
    pub fn format_row(row: &LocatedRow) -> String {
        let r = &row.row;
        let cells: [Option<&str>; 13] = [
            r.api10.as_deref(),
            r.api14.as_deref(),
            r.group_id.as_deref(),
            r.well_status.as_deref(),
            r.operator.as_deref(),
            r.completion_year.as_deref(),
            r.lateral_length_ft.as_deref(),
            r.proppant_lbs_per_ft.as_deref(),
            r.fluid_bbl_per_ft.as_deref(),
            r.spacing_ft.as_deref(),
            r.boundary_category.as_deref(),
            Some(row.basin.as_str()),
            Some(row.flow_unit.as_str()),
        ];
        cells
            .iter()
            .map(|c| csv_escape(c.unwrap_or("")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl WellDataSource for CsvWellSource {
    fn fetch(&self, query: &WellQuery) -> Result<Vec<RawWellRow>, DataRetrievalError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.basin == query.basin && r.flow_unit == query.flow_unit)
            .filter(|r| matches_status_and_year(&r.row, query.min_completion_year))
            .map(|r| r.row)
            .collect())
    }

    fn source_name(&self) -> &str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_split_quoted_fields() {
        let fields = csv_split(r#"a,"b,c","say ""hi""",,d"#);
        assert_eq!(fields, vec!["a", "b,c", "say \"hi\"", "", "d"]);
    }

    #[test]
    fn test_escape_roundtrip() {
        let line = [
            csv_escape("plain"),
            csv_escape("Smith, Jones & Co"),
            csv_escape("6\" gap"),
        ]
        .join(",");
        assert_eq!(csv_split(&line), vec!["plain", "Smith, Jones & Co", "6\" gap"]);
    }

    #[test]
    fn test_line_breaks_stay_on_one_record() {
        let located = LocatedRow {
            basin: "Permian".into(),
            flow_unit: "WCA".into(),
            row: RawWellRow {
                api10: Some("4200000001".to_string()),
                operator: Some("Mesa\nOperating, LLC\r\nWest".to_string()),
                ..RawWellRow::default()
            },
        };
        let line = CsvWellSource::format_row(&located);
        assert_eq!(line.lines().count(), 1);

        let map = ColumnMap::from_header(&CsvWellSource::header_line()).unwrap();
        let parsed = map.parse_row(&csv_split(&line));
        assert_eq!(parsed.row.operator.as_deref(), Some("Mesa Operating, LLC West"));
        assert_eq!(parsed.flow_unit, "WCA");
    }

    #[test]
    fn test_header_missing_required_column() {
        let err = ColumnMap::from_header("API10,wellStatus,CompletionYear").unwrap_err();
        assert!(matches!(err, DataRetrievalError::MissingColumn(c) if c == "LateralLength_FT"));
    }

    #[test]
    fn test_header_is_case_insensitive_and_order_free() {
        let header = "flowunit_analog,basinquantum,spacinghzanyzoneatdrill,fluid_bblperft,\
                      proppant_lbsperft,laterallength_ft,completionyear,wellstatus,api10";
        let map = ColumnMap::from_header(header).unwrap();
        assert_eq!(map.api10, 8);
        assert_eq!(map.flow_unit, 0);
        assert!(map.group_id.is_none());
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let map = ColumnMap::from_header(&CsvWellSource::header_line()).unwrap();
        let line = "4200000001,,,PRODUCING,,2019, ,1800,40,660,,Permian,WCA";
        let located = map.parse_row(&csv_split(line));
        assert_eq!(located.row.api10.as_deref(), Some("4200000001"));
        assert!(located.row.group_id.is_none());
        assert!(located.row.lateral_length_ft.is_none());
        assert_eq!(located.basin, "Permian");
    }
}
