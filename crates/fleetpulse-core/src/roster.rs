//! Device roster loading.
//!
//! The roster is a CSV file with a header row followed by one device per
//! row; the device ID is the first column. Blank rows and rows with an empty
//! ID are skipped. A leading UTF-8 byte order mark is ignored.
//!
//! Only the first column is read. Rows whose field count differs from the
//! header are loaded anyway, with a warning.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};

use crate::error::RosterError;
use crate::registry::Registry;

const BOM: char = '\u{feff}';

/// Load the roster at `path` into `registry`.
///
/// Returns the number of device rows read.
pub fn load_roster(path: impl AsRef<Path>, registry: &Registry) -> Result<usize, RosterError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RosterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_roster(BufReader::new(file), registry)?;
    info!(
        "loaded {rows} devices from {} ({} distinct)",
        path.display(),
        registry.len()
    );
    Ok(rows)
}

/// Parse roster CSV from `reader`, registering each device ID.
pub fn parse_roster<R: BufRead>(reader: R, registry: &Registry) -> Result<usize, RosterError> {
    let mut lines = reader.lines();

    let header = loop {
        match lines.next() {
            None => return Err(RosterError::Empty),
            Some(line) => {
                let line = line?;
                let line = line.trim_start_matches(BOM);
                if !line.trim().is_empty() {
                    break line.to_string();
                }
            }
        }
    };
    if header.split(',').all(|field| unquote(field).is_empty()) {
        return Err(RosterError::EmptyHeader);
    }
    debug!("roster header: {header}");
    let columns = field_count(&header);

    let mut rows = 0;
    for line in lines {
        let line = line?;
        let device_id = first_field(&line);
        if device_id.is_empty() {
            continue;
        }
        let fields = field_count(&line);
        if fields != columns {
            warn!("roster row {device_id:?} has {fields} fields, header has {columns}");
        }
        registry.register_device(&device_id);
        rows += 1;
    }
    Ok(rows)
}

/// First CSV field of `line`, unquoted and trimmed.
fn first_field(line: &str) -> String {
    let line = line.trim_start();
    let Some(rest) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().trim().to_string();
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            field.push(c);
        } else if chars.peek() == Some(&'"') {
            field.push('"');
            chars.next();
        } else {
            break;
        }
    }
    field.trim().to_string()
}

/// Number of comma-separated fields in `line`, ignoring commas inside quotes.
fn field_count(line: &str) -> usize {
    let mut in_quotes = false;
    let mut count = 1;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => count += 1,
            _ => {}
        }
    }
    count
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}
