//! CSV reading and writing for statistics tables, candidate pools and reports.
//!
//! - **Delimiter resolution**: `.tsv` inputs default to tab, everything else
//!   to comma, unless overridden.
//! - **Encoding**: inputs are decoded through `encoding_rs` (UTF-8 default);
//!   outputs are UTF-8, optionally prefixed with a byte order mark.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Missing cells**: empty cells and the missing marker read as Missing and
//!   Missing is written back as the marker.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

use crate::{
    data::Value,
    dataset::{Dataset, RenameEntry, Table},
    fuzzy::{Candidate, CandidatePool},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reader settings shared by every input file.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub missing_marker: String,
    pub skip_rows: usize,
}

impl ReadOptions {
    pub fn new(missing_marker: impl Into<String>) -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            missing_marker: missing_marker.into(),
            skip_rows: 0,
        }
    }
}

/// Writer settings for CSV outputs.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub delimiter: Option<u8>,
    pub missing_marker: String,
    pub bom: bool,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

fn open_csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Header row plus raw data rows, after skipping `skip_rows` leading rows.
fn read_raw(path: &Path, options: &ReadOptions) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let delimiter = resolve_delimiter(Some(path), options.delimiter);
    let mut reader = open_csv_reader(open_input(path)?, delimiter);
    let mut records = reader.byte_records().enumerate().skip(options.skip_rows);

    let mut headers = match records.next() {
        Some((line, record)) => {
            let record = record.with_context(|| format!("Reading header row {}", line + 1))?;
            decode_record(&record, options.encoding)?
        }
        None => return Ok((Vec::new(), Vec::new())),
    };
    if let Some(first) = headers.first_mut()
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        *first = stripped.to_string();
    }

    let mut rows = Vec::new();
    for (line, record) in records {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", line + 1))?;
        rows.push(decode_record(&record, options.encoding)?);
    }
    Ok((headers, rows))
}

/// Loads one raw statistics table. Duplicate headers are renamed `X.1`, `X.2`.
pub fn read_table(path: &Path, label: &str, options: &ReadOptions) -> Result<Table> {
    let (headers, rows) = read_raw(path, options)?;
    if headers.is_empty() {
        warn!("Input {path:?} for '{label}' is empty");
    }
    let table = Table::from_rows(label, &headers, rows, &options.missing_marker);
    debug!(
        "Read '{}' from {path:?}: {} row(s) x {} column(s)",
        label,
        table.len(),
        table.schema().len()
    );
    Ok(table)
}

pub fn read_dataset(path: &Path, options: &ReadOptions) -> Result<Dataset> {
    let label = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("input");
    Ok(read_table(path, label, options)?.data)
}

/// Loads (name, value) pairs; rows without a name or a value are skipped.
pub fn read_candidate_pool(
    path: &Path,
    name_column: &str,
    value_column: &str,
    options: &ReadOptions,
) -> Result<CandidatePool> {
    let data = read_dataset(path, options)?;
    if data.schema.is_empty() {
        return Ok(CandidatePool::default());
    }
    let name_idx = data
        .schema
        .column_index(name_column)
        .ok_or_else(|| anyhow!("Candidate column '{name_column}' not found in {path:?}"))?;
    let value_idx = data
        .schema
        .column_index(value_column)
        .ok_or_else(|| anyhow!("Candidate column '{value_column}' not found in {path:?}"))?;

    let mut nameless = 0usize;
    let mut valueless = 0usize;
    let mut candidates = Vec::with_capacity(data.len());
    for record in &data.records {
        let (name, value) = (record.get(name_idx), record.get(value_idx));
        if name.is_missing() {
            nameless += 1;
            continue;
        }
        if value.is_missing() {
            valueless += 1;
            continue;
        }
        candidates.push(Candidate {
            name: name.as_display(&options.missing_marker),
            value: value.clone(),
        });
    }
    if nameless > 0 {
        debug!("Skipped {nameless} candidate row(s) without a name in {path:?}");
    }
    if valueless > 0 {
        debug!("Skipped {valueless} candidate row(s) without a value in {path:?}");
    }
    Ok(CandidatePool::new(candidates))
}

fn open_output(path: Option<&Path>, bom: bool) -> Result<Box<dyn Write>> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    if bom {
        writer.write_all(UTF8_BOM)?;
    }
    Ok(writer)
}

/// Writes `data` as CSV to `path` (stdout when `None` or `-`).
pub fn write_dataset(path: Option<&Path>, data: &Dataset, options: &WriteOptions) -> Result<()> {
    let delimiter = resolve_delimiter(path, options.delimiter);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(open_output(path, options.bom)?);
    writer.write_record(data.schema.names())?;
    for record in &data.records {
        writer.write_record(
            record
                .values()
                .iter()
                .map(|value: &Value| value.as_display(&options.missing_marker)),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_rename_log(path: &Path, renames: &[RenameEntry]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating rename log {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, renames)
        .with_context(|| format!("Serializing rename log to {path:?}"))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_text(path: Option<&Path>, contents: &str) -> Result<()> {
    let mut writer = open_output(path, false)?;
    writer.write_all(contents.as_bytes())?;
    writer.flush()?;
    Ok(())
}
