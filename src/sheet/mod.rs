pub mod images;

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::model::Record;

pub type Rows = Vec<Vec<String>>;

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Turns a row-major grid (first row = headers) into records.
///
/// Blank rows are dropped without consuming an index; short rows are padded
/// with empty values.
pub fn extract_records(rows: &[Vec<String>]) -> Result<(Vec<String>, Vec<Record>)> {
    if rows.len() < 2 {
        return Err(Error::MalformedInput(
            "the sheet needs a header row and at least one data row".into(),
        ));
    }

    let headers: Vec<String> = rows[0].iter().map(|h| h.trim().to_string()).collect();

    let mut records = Vec::new();
    for (data_row, row) in rows[1..].iter().enumerate() {
        if row.iter().all(|c| is_blank(c)) {
            continue;
        }
        let fields = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = row.get(col).map(|v| v.trim()).unwrap_or("");
                (header.clone(), value.to_string())
            })
            .collect();
        records.push(Record::new(records.len(), data_row, fields));
    }

    log::debug!(
        "extracted {} records from {} data rows ({} columns)",
        records.len(),
        rows.len() - 1,
        headers.len()
    );
    Ok((headers, records))
}

/// Reads the first worksheet of a workbook. The format (`.xlsx`, legacy
/// `.xls`, `.xlsb`, `.ods`) is detected from the bytes.
pub fn read_sheet(data: &[u8]) -> Result<Rows> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| Error::MalformedInput(format!("failed to read workbook: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::MalformedInput("workbook has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::MalformedInput(format!("failed to read sheet '{sheet_name}': {e}")))?;

    // Absolute coordinates keep row numbers aligned with drawing anchors.
    let Some((end_row, end_col)) = range.end() else {
        return Ok(Vec::new());
    };
    let rows = (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| range.get_value((r, c)).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(n) => format_float(*n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_date(serial) {
                Some(date) => date.format("%d/%m/%Y").to_string(),
                None => format_float(serial),
            }
        }
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s.split('T').next().unwrap_or(s), "%Y-%m-%d")
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|_| s.clone()),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => "#ERR".to_string(),
    }
}

fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Excel serial day → date. Day 0 is 1899-12-30 once the 1900 leap-year
/// bug is skipped for serials at or above 60.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.floor() as i64;
    let adjusted = if days >= 60 { days } else { days + 1 };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(chrono::Duration::days(adjusted))
}
