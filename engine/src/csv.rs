//! CSV import and export.
//!
//! Import headers are fixed per kind: members carry `nombre` plus optional
//! `isprotected`; reasons carry `descripcion` plus optional `isquickreason`
//! and `isprotected`; entries must carry exactly `fecha, integranteNombre,
//! movimiento, razonDescripcion, descripcion, monto`. Header names match
//! case-insensitively and in any order.
//!
//! Reading collects every row problem before failing, so the caller can
//! report all of them together. Export mirrors the import headers; string
//! fields are always double-quoted with internal quotes doubled, booleans
//! are bare `true`/`false`.

use crate::{
    entity::MovementType,
    error::{Error, Result, RowError},
    store::Store,
    Timestamp,
};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::io::Read;

/// Calendar-day format used by `fecha`: day/month/year.
pub const CSV_DATE_FORMAT: &str = "%d/%m/%Y";

/// A parsed member import row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    /// 1-based source line (header is line 1)
    pub line: u64,
    pub name: String,
    pub protected: bool,
}

/// A parsed reason import row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonRow {
    pub line: u64,
    pub description: String,
    pub quick_reason: bool,
    pub protected: bool,
}

/// A parsed entry import row. Member and reason are still names at this
/// point; the store resolves them during import.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub line: u64,
    pub date: NaiveDate,
    pub member_name: String,
    pub movement: MovementType,
    pub reason_description: String,
    pub description: String,
    pub amount: Decimal,
}

fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn header_error(message: impl Into<String>) -> Error {
    Error::ImportParse(vec![RowError::new(1, message)])
}

fn parse_flag(value: Option<&str>, column: &str, line: u64, errors: &mut Vec<RowError>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(s) if s.eq_ignore_ascii_case("true") => true,
        Some(s) if s.eq_ignore_ascii_case("false") => false,
        Some(other) => {
            errors.push(RowError::new(
                line,
                format!("invalid {column}: '{other}' (expected true or false)"),
            ));
            false
        }
    }
}

/// Read member rows: header `nombre` (required), `isprotected` (optional).
pub fn read_members<R: Read>(reader: R) -> Result<Vec<MemberRow>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| header_error(format!("invalid header row: {e}")))?
        .clone();

    let name_idx =
        header_index(&headers, "nombre").ok_or_else(|| header_error("missing required column: nombre"))?;
    let protected_idx = header_index(&headers, "isprotected");

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let line = i as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(RowError::new(line, format!("malformed row: {e}")));
                continue;
            }
        };

        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            errors.push(RowError::new(line, "empty nombre"));
            continue;
        }
        let protected = parse_flag(
            protected_idx.and_then(|i| record.get(i)),
            "isprotected",
            line,
            &mut errors,
        );

        rows.push(MemberRow {
            line,
            name: name.to_string(),
            protected,
        });
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(Error::ImportParse(errors))
    }
}

/// Read reason rows: header `descripcion` (required), `isquickreason` and
/// `isprotected` (optional).
pub fn read_reasons<R: Read>(reader: R) -> Result<Vec<ReasonRow>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| header_error(format!("invalid header row: {e}")))?
        .clone();

    let description_idx = header_index(&headers, "descripcion")
        .ok_or_else(|| header_error("missing required column: descripcion"))?;
    let quick_idx = header_index(&headers, "isquickreason");
    let protected_idx = header_index(&headers, "isprotected");

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let line = i as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(RowError::new(line, format!("malformed row: {e}")));
                continue;
            }
        };

        let description = record.get(description_idx).unwrap_or("").trim();
        if description.is_empty() {
            errors.push(RowError::new(line, "empty descripcion"));
            continue;
        }
        let quick_reason = parse_flag(
            quick_idx.and_then(|i| record.get(i)),
            "isquickreason",
            line,
            &mut errors,
        );
        let protected = parse_flag(
            protected_idx.and_then(|i| record.get(i)),
            "isprotected",
            line,
            &mut errors,
        );

        rows.push(ReasonRow {
            line,
            description: description.to_string(),
            quick_reason,
            protected,
        });
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(Error::ImportParse(errors))
    }
}

const ENTRY_COLUMNS: [&str; 6] = [
    "fecha",
    "integranteNombre",
    "movimiento",
    "razonDescripcion",
    "descripcion",
    "monto",
];

/// Read entry rows. The header must contain exactly the six entry columns.
pub fn read_entries<R: Read>(reader: R) -> Result<Vec<EntryRow>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| header_error(format!("invalid header row: {e}")))?
        .clone();

    let missing: Vec<&str> = ENTRY_COLUMNS
        .iter()
        .filter(|c| header_index(&headers, c).is_none())
        .copied()
        .collect();
    if !missing.is_empty() || headers.len() != ENTRY_COLUMNS.len() {
        return Err(header_error(format!(
            "entries header must contain exactly: {}",
            ENTRY_COLUMNS.join(", ")
        )));
    }

    // The exact-set check above guarantees every index resolves.
    let idx = |name: &str| header_index(&headers, name).unwrap_or_default();
    let fecha_idx = idx("fecha");
    let member_idx = idx("integranteNombre");
    let movement_idx = idx("movimiento");
    let reason_idx = idx("razonDescripcion");
    let description_idx = idx("descripcion");
    let amount_idx = idx("monto");

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let line = i as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                errors.push(RowError::new(line, format!("malformed row: {e}")));
                continue;
            }
        };

        let mut row_ok = true;

        let date = match NaiveDate::parse_from_str(
            record.get(fecha_idx).unwrap_or("").trim(),
            CSV_DATE_FORMAT,
        ) {
            Ok(date) => Some(date),
            Err(e) => {
                errors.push(RowError::new(line, format!("invalid fecha: {e}")));
                row_ok = false;
                None
            }
        };

        let member_name = record.get(member_idx).unwrap_or("").trim().to_string();
        if member_name.is_empty() {
            errors.push(RowError::new(line, "empty integranteNombre"));
            row_ok = false;
        }

        let movement = match MovementType::parse(record.get(movement_idx).unwrap_or("")) {
            Some(movement) => Some(movement),
            None => {
                errors.push(RowError::new(
                    line,
                    format!(
                        "unknown movimiento: '{}'",
                        record.get(movement_idx).unwrap_or("")
                    ),
                ));
                row_ok = false;
                None
            }
        };

        let reason_description = record.get(reason_idx).unwrap_or("").trim().to_string();
        if reason_description.is_empty() {
            errors.push(RowError::new(line, "empty razonDescripcion"));
            row_ok = false;
        }

        let amount = match record.get(amount_idx).unwrap_or("").trim().parse::<Decimal>() {
            Ok(amount) => Some(amount),
            Err(e) => {
                errors.push(RowError::new(line, format!("invalid monto: {e}")));
                row_ok = false;
                None
            }
        };

        if !row_ok {
            continue;
        }
        if let (Some(date), Some(movement), Some(amount)) = (date, movement, amount) {
            rows.push(EntryRow {
                line,
                date,
                member_name,
                movement,
                reason_description,
                description: record.get(description_idx).unwrap_or("").trim().to_string(),
                amount,
            });
        }
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(Error::ImportParse(errors))
    }
}

/// Wrap a string field in double quotes, doubling internal quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl Store {
    /// Export active members, mirroring the import header.
    pub fn export_members_csv(&self) -> String {
        let mut members: Vec<_> = self.members.active().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let mut out = String::from("nombre,isprotected\n");
        for member in members {
            out.push_str(&format!("{},{}\n", quote(&member.name), member.protected));
        }
        out
    }

    /// Export active reasons, mirroring the import header.
    pub fn export_reasons_csv(&self) -> String {
        let mut reasons: Vec<_> = self.reasons.active().collect();
        reasons.sort_by(|a, b| a.description.cmp(&b.description).then(a.id.cmp(&b.id)));

        let mut out = String::from("descripcion,isquickreason,isprotected\n");
        for reason in reasons {
            out.push_str(&format!(
                "{},{},{}\n",
                quote(&reason.description),
                reason.quick_reason,
                reason.protected
            ));
        }
        out
    }

    /// Export active entries, mirroring the import header.
    ///
    /// Member and reason identifiers are resolved back to their names;
    /// tombstoned referents still resolve (the name survives on the
    /// tombstone), a missing referent exports as an empty field.
    pub fn export_entries_csv(&self) -> String {
        let mut entries: Vec<_> = self.entries.active().collect();
        entries.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.meta.created_at.cmp(&b.meta.created_at))
                .then(a.id.cmp(&b.id))
        });

        let mut out =
            String::from("fecha,integranteNombre,movimiento,razonDescripcion,descripcion,monto\n");
        for entry in entries {
            let member_name = self
                .members
                .get(&entry.member_id)
                .map(|m| m.name.as_str())
                .unwrap_or("");
            let reason_description = self
                .reasons
                .get(&entry.reason_id)
                .map(|r| r.description.as_str())
                .unwrap_or("");

            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                entry.date.format(CSV_DATE_FORMAT),
                quote(member_name),
                entry.movement,
                quote(reason_description),
                quote(&entry.description),
                entry.amount
            ));
        }
        out
    }

    /// Parse and import a members CSV in one step.
    pub fn import_members_csv(
        &mut self,
        text: &str,
        mode: crate::store::ImportMode,
        now: Timestamp,
        ids: &mut dyn crate::IdGen,
    ) -> Result<crate::store::ImportOutcome> {
        let rows = read_members(text.as_bytes())?;
        self.import(crate::store::ImportBatch::Members(rows), mode, now, ids)
    }

    /// Parse and import a reasons CSV in one step.
    pub fn import_reasons_csv(
        &mut self,
        text: &str,
        mode: crate::store::ImportMode,
        now: Timestamp,
        ids: &mut dyn crate::IdGen,
    ) -> Result<crate::store::ImportOutcome> {
        let rows = read_reasons(text.as_bytes())?;
        self.import(crate::store::ImportBatch::Reasons(rows), mode, now, ids)
    }

    /// Parse and import an entries CSV in one step.
    pub fn import_entries_csv(
        &mut self,
        text: &str,
        mode: crate::store::ImportMode,
        now: Timestamp,
        ids: &mut dyn crate::IdGen,
    ) -> Result<crate::store::ImportOutcome> {
        let rows = read_entries(text.as_bytes())?;
        self.import(crate::store::ImportBatch::Entries(rows), mode, now, ids)
    }
}
