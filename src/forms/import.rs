use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls, Xlsx};
use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::platform::is_known_platform;
use crate::domain::row::{CellValue, RawRow};
use crate::domain::types::{BatchName, LocationId, TypeConstraintError};

/// Default number of rows reconciled between commits.
pub const DEFAULT_BATCH_SIZE: usize = 50;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Spreadsheet upload as received from the operator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImportProductsForm {
    /// Original file name, used as the batch label.
    #[validate(length(min = 1))]
    pub file_name: String,
    #[validate(length(min = 1, message = "uploaded file is empty"))]
    #[serde(skip)]
    pub file: Vec<u8>,
    #[validate(custom(function = known_platform))]
    pub platform: String,
    #[validate(range(min = 1))]
    pub default_location: Option<i32>,
    #[validate(range(min = 1))]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn known_platform(platform: &str) -> Result<(), ValidationError> {
    if is_known_platform(platform) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_platform")
            .with_message(format!("unknown platform tag '{platform}'").into()))
    }
}

/// Validated import request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportProductsPayload {
    pub batch_name: BatchName,
    pub platform: String,
    pub default_location: Option<LocationId>,
    pub batch_size: usize,
    pub file: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ImportProductsFormError {
    #[error("Import form validation failed: {0}")]
    Validation(String),
    #[error("Import form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<ValidationErrors> for ImportProductsFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for ImportProductsFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<ImportProductsForm> for ImportProductsPayload {
    type Error = ImportProductsFormError;

    fn try_from(value: ImportProductsForm) -> Result<Self, Self::Error> {
        value.validate()?;
        let default_location = value.default_location.map(LocationId::new).transpose()?;

        Ok(Self {
            batch_name: BatchName::new(value.file_name)?,
            platform: value.platform.trim().to_ascii_lowercase(),
            default_location,
            batch_size: value.batch_size,
            file: value.file,
        })
    }
}

#[derive(Debug, Error)]
pub enum UploadParseError {
    #[error("failed to parse XLSX: {0}")]
    Xlsx(#[from] calamine::XlsxError),
    #[error("failed to parse XLS: {0}")]
    Xls(#[from] calamine::XlsError),
    #[error("uploaded file has no worksheet")]
    MissingSheet,
    #[error("file is neither XLSX ({xlsx}) nor XLS ({xls})")]
    Unreadable { xlsx: String, xls: String },
}

/// Reads the first worksheet of an XLSX workbook, or of a legacy XLS one when
/// the bytes are not XLSX.
///
/// The first row is treated as a header and dropped, as are rows without any
/// value. Cell positions match spreadsheet columns even when the used range
/// does not start at column A.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<Vec<RawRow>, UploadParseError> {
    match read_xlsx(bytes) {
        Ok(rows) => Ok(rows),
        Err(xlsx_err) => read_xls(bytes).map_err(|xls_err| UploadParseError::Unreadable {
            xlsx: xlsx_err.to_string(),
            xls: xls_err.to_string(),
        }),
    }
}

fn read_xlsx(bytes: &[u8]) -> Result<Vec<RawRow>, UploadParseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(UploadParseError::MissingSheet)??;
    Ok(rows_from_range(&range))
}

fn read_xls(bytes: &[u8]) -> Result<Vec<RawRow>, UploadParseError> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(UploadParseError::MissingSheet)??;
    Ok(rows_from_range(&range))
}

fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let (start_row, start_col) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    range
        .rows()
        .enumerate()
        .skip(1)
        .map(|(idx, row)| {
            let mut cells = vec![CellValue::Empty; start_col];
            cells.extend(row.iter().map(cell_value));
            RawRow::new(start_row + idx + 1, cells)
        })
        .filter(|row| !row.is_blank())
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(number) => CellValue::Float(*number),
        Data::Int(number) => CellValue::Int(*number),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::Error(err) => CellValue::Error(err.to_string()),
        _ => CellValue::Text(cell.to_string()),
    }
}
