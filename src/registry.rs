//! Vehicle registry built on the two containers.
//!
//! Records are kept twice: in insertion order in a `DynamicArray` and by id
//! in a `HashTable`. The registry is responsible for keeping both views
//! consistent; the containers know nothing about each other.
//!
//! The text form is one record per line:
//! `TYPE,id,model,enginePower,maxSpeed,yyyy-MM-dd,price`. Parsing is
//! lenient. Malformed numbers fall back to zero, bad dates to `None`, and
//! each repair is reported as a `Diagnostic`. Lines with the wrong field
//! count or an unknown type are skipped.

use crate::dynamic_array::{self, DynamicArray};
use crate::error::ContainerError;
use crate::hash_table::{self, DefaultHashBuilder, HashTable};
use core::fmt;
use core::str::FromStr;
use thiserror::Error;

const FIELD_COUNT: usize = 7;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum VehicleKind {
    Motorcycle,
    Quadricycle,
    Moped,
    Scooter,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Motorcycle,
        VehicleKind::Quadricycle,
        VehicleKind::Moped,
        VehicleKind::Scooter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::Motorcycle => "MOTORCYCLE",
            VehicleKind::Quadricycle => "QUADRICYCLE",
            VehicleKind::Moped => "MOPED",
            VehicleKind::Scooter => "SCOOTER",
        }
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unknown vehicle kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for VehicleKind {
    type Err = UnknownKind;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Calendar date in `yyyy-MM-dd` form. Only real dates are representable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ReleaseDate {
    year: u16,
    month: u8,
    day: u8,
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

impl ReleaseDate {
    pub fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        if day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    pub fn year(&self) -> u16 {
        self.year
    }
    pub fn month(&self) -> u8 {
        self.month
    }
    pub fn day(&self) -> u8 {
        self.day
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid date '{0}', expected yyyy-MM-dd")]
pub struct InvalidDate(pub String);

impl FromStr for ReleaseDate {
    type Err = InvalidDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDate(s.to_string());
        let mut parts = s.split('-');
        let (Some(y), Some(m), Some(d), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let digits = |p: &str, len: usize| p.len() == len && p.bytes().all(|b| b.is_ascii_digit());
        if !(digits(y, 4) && digits(m, 2) && digits(d, 2)) {
            return Err(invalid());
        }
        let year: u16 = y.parse().map_err(|_| invalid())?;
        let month: u8 = m.parse().map_err(|_| invalid())?;
        let day: u8 = d.parse().map_err(|_| invalid())?;
        Self::new(year, month, day).ok_or_else(invalid)
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: i64,
    pub kind: VehicleKind,
    pub model: String,
    pub engine_power: f64,
    pub max_speed: i32,
    pub release_date: Option<ReleaseDate>,
    pub price: f64,
}

impl Vehicle {
    /// Check that `to_line` output reads back as an equal record: the model
    /// must not break the field or line structure and decimals must be
    /// finite.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason| RegistryError::InvalidRecord {
            id: self.id,
            reason,
        };
        if self.model.contains(|c: char| matches!(c, ',' | '\n' | '\r')) {
            return Err(invalid("model contains a field or line separator"));
        }
        if self.model.trim() != self.model {
            return Err(invalid("model has surrounding whitespace"));
        }
        if !self.engine_power.is_finite() {
            return Err(invalid("engine power is not finite"));
        }
        if !self.price.is_finite() {
            return Err(invalid("price is not finite"));
        }
        Ok(())
    }

    /// Serialize to the line format read by `parse_line`. Decimals use the
    /// shortest text that parses back to the same value, which may be in
    /// exponent form.
    pub fn to_line(&self) -> String {
        let date = self
            .release_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        format!(
            "{},{},{},{:?},{},{},{:?}",
            self.kind, self.id, self.model, self.engine_power, self.max_speed, date, self.price
        )
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {}, power={:?}, maxSpeed={}, date=",
            self.kind, self.id, self.model, self.engine_power, self.max_speed
        )?;
        match self.release_date {
            Some(d) => write!(f, "{}", d)?,
            None => f.write_str("none")?,
        }
        write!(f, ", price={:?}", self.price)
    }
}

/// A repair or rejection made while parsing one input line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

struct LineNotes<'a> {
    line: usize,
    diagnostics: &'a mut DynamicArray<Diagnostic>,
}

impl LineNotes<'_> {
    fn note(&mut self, message: String) {
        tracing::warn!(line = self.line, %message, "vehicle record repaired or skipped");
        self.diagnostics.push(Diagnostic {
            line: self.line,
            message,
        });
    }

    fn integer(&mut self, raw: &str, field: &str) -> i64 {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        if cleaned.is_empty() || cleaned == "-" {
            self.note(format!("invalid {} '{}', set to 0", field, raw));
            return 0;
        }
        cleaned.parse().unwrap_or_else(|_| {
            self.note(format!("unparsable {} '{}', set to 0", field, raw));
            0
        })
    }

    fn decimal(&mut self, raw: &str, field: &str) -> f64 {
        // Well-formed text, including exponent form, is taken as is.
        if let Ok(value) = raw.trim().parse::<f64>() {
            if value.is_finite() {
                return value;
            }
        }
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
            .collect();
        if cleaned.is_empty() || cleaned == "-" || cleaned == "." {
            self.note(format!("invalid {} '{}', set to 0", field, raw));
            return 0.0;
        }
        cleaned.parse().unwrap_or_else(|_| {
            self.note(format!("unparsable {} '{}', set to 0", field, raw));
            0.0
        })
    }
}

/// Parse one non-blank line. Returns `None` when the line is skipped; every
/// skip or repair appends to `diagnostics`.
pub fn parse_line(
    line: &str,
    line_no: usize,
    diagnostics: &mut DynamicArray<Diagnostic>,
) -> Option<Vehicle> {
    let mut notes = LineNotes {
        line: line_no,
        diagnostics,
    };
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FIELD_COUNT {
        notes.note(format!(
            "expected {} fields, got {}; skipped: {}",
            FIELD_COUNT,
            fields.len(),
            line
        ));
        return None;
    }

    let kind = match fields[0].parse::<VehicleKind>() {
        Ok(kind) => kind,
        Err(e) => {
            notes.note(format!("{}; skipped", e));
            return None;
        }
    };

    let id = notes.integer(fields[1], "id");

    let model = fields[2].trim().to_string();
    if model.is_empty() {
        notes.note("empty model".to_string());
    }

    let engine_power = notes.decimal(fields[3], "engine power");

    let max_speed = notes.integer(fields[4], "max speed");
    let max_speed = i32::try_from(max_speed).unwrap_or_else(|_| {
        notes.note(format!("max speed {} out of range, set to 0", max_speed));
        0
    });

    let date = fields[5].trim();
    let release_date = if date.is_empty() {
        notes.note("empty date".to_string());
        None
    } else {
        match date.parse::<ReleaseDate>() {
            Ok(d) => Some(d),
            Err(e) => {
                notes.note(format!("{}; date left empty", e));
                None
            }
        }
    };

    let price = notes.decimal(fields[6], "price");

    Some(Vehicle {
        id,
        kind,
        model,
        engine_power,
        max_speed,
        release_date,
        price,
    })
}

/// Parsed records in input order plus every diagnostic raised.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub vehicles: DynamicArray<Vehicle>,
    pub diagnostics: DynamicArray<Diagnostic>,
}

/// Parse a whole document. Blank lines are ignored; line numbers are 1-based.
pub fn parse_records(input: &str) -> LoadReport {
    let mut report = LoadReport::default();
    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(v) = parse_line(line, i + 1, &mut report.diagnostics) {
            report.vehicles.push(v);
        }
    }
    report
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum RegistryError {
    #[error("vehicle id {0} is already registered")]
    DuplicateId(i64),
    #[error("no vehicle with id {0}")]
    UnknownId(i64),
    #[error("vehicle {id} cannot be stored: {reason}")]
    InvalidRecord { id: i64, reason: &'static str },
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Result of `VehicleRegistry::load`.
#[derive(Debug)]
pub struct Loaded {
    pub registry: VehicleRegistry,
    pub diagnostics: DynamicArray<Diagnostic>,
    /// Records dropped because an earlier record already used their id.
    pub duplicates: DynamicArray<Vehicle>,
}

#[derive(Debug, Default)]
pub struct VehicleRegistry {
    records: DynamicArray<Vehicle>,
    index: HashTable<i64, Vehicle>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `input` and index the result. The first record for an id wins.
    pub fn load(input: &str) -> Result<Loaded, RegistryError> {
        let LoadReport {
            vehicles,
            diagnostics,
        } = parse_records(input);
        let mut registry = Self {
            records: vehicles,
            index: HashTable::new(),
        };
        let duplicates = registry.rebuild_index()?;
        for v in duplicates.iter() {
            tracing::warn!(id = v.id, "dropped record with duplicate id");
        }
        tracing::debug!(
            records = registry.len(),
            diagnostics = diagnostics.len(),
            dropped = duplicates.len(),
            "loaded vehicle registry"
        );
        Ok(Loaded {
            registry,
            diagnostics,
            duplicates,
        })
    }

    /// Recompute the id index from the record list, removing every record
    /// whose id was already seen. Returns the removed records.
    pub fn rebuild_index(&mut self) -> Result<DynamicArray<Vehicle>, RegistryError> {
        self.index.clear();
        let mut dropped = DynamicArray::new();
        let mut cursor = self.records.cursor();
        loop {
            let duplicate = match cursor.next(&self.records)? {
                None => break,
                Some(v) if self.index.contains_key(&v.id) => true,
                Some(v) => {
                    self.index.insert(v.id, v.clone());
                    false
                }
            };
            if duplicate {
                dropped.push(cursor.remove(&mut self.records)?);
            }
        }
        Ok(dropped)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Vehicle> {
        self.index.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains_key(&id)
    }

    /// Append a record. Rejects an existing id and any record that
    /// `Vehicle::validate` refuses.
    pub fn add(&mut self, vehicle: Vehicle) -> Result<(), RegistryError> {
        vehicle.validate()?;
        if self.index.contains_key(&vehicle.id) {
            return Err(RegistryError::DuplicateId(vehicle.id));
        }
        self.index.insert(vehicle.id, vehicle.clone());
        self.records.push(vehicle);
        Ok(())
    }

    /// Replace the record with the same id, keeping its position. Returns
    /// the previous record.
    pub fn update(&mut self, vehicle: Vehicle) -> Result<Vehicle, RegistryError> {
        vehicle.validate()?;
        let id = vehicle.id;
        let position = self
            .records
            .iter()
            .position(|v| v.id == id)
            .ok_or(RegistryError::UnknownId(id))?;
        let previous = self.records.set(position, vehicle.clone())?;
        self.index.insert(id, vehicle);
        Ok(previous)
    }

    pub fn remove(&mut self, id: i64) -> Result<Vehicle, RegistryError> {
        if self.index.remove(&id).is_none() {
            return Err(RegistryError::UnknownId(id));
        }
        let mut cursor = self.records.cursor();
        while let Some(v) = cursor.next(&self.records)? {
            if v.id == id {
                return Ok(cursor.remove(&mut self.records)?);
            }
        }
        Err(RegistryError::UnknownId(id))
    }

    /// Records in insertion order.
    pub fn iter(&self) -> dynamic_array::Iter<'_, Vehicle> {
        self.records.iter()
    }

    /// Records in index order.
    pub fn indexed(&self) -> hash_table::Values<'_, i64, Vehicle, DefaultHashBuilder> {
        self.index.values()
    }

    /// Serialize every record, one line each, in insertion order. Records
    /// added through `add`/`update` reload unchanged through `load`.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for (i, v) in self.records.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&v.to_line());
        }
        out
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        self.records.len() == self.index.len()
            && self
                .records
                .iter()
                .all(|v| self.index.get(&v.id) == Some(v))
    }
}
