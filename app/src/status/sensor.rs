//! Flattens the `sensor_descr` / `sensor_values` structure of a status document
//! into one reading per sensor instance and field, keyed by an identifier that is
//! stable across polls and safe to use as a variable name.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::pdu::{SensorDescription, SensorField, StatusDocument};

const KEY_PREFIX: &str = "sensor";
const KEY_SEPARATOR: char = '_';
const MAX_DEC_PRECISION: usize = 10;

pub type SensorMap = BTreeMap<String, SensorReading>;

/// Parsed form of a sensor property `id`, e.g. `"2: 7210 - I1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorId {
    WithInput { sensor: String, input: String },
    Sensor { sensor: String },
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Number(f64),
    Text(String),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub key: String,
    pub sensor_id: SensorId,
    pub sensor_name: String,
    /// User-assigned name of the sensor instance, if the device reports one.
    pub label: Option<String>,
    pub field_name: String,
    pub sensor_type: i64,
    pub type_name: String,
    pub value: SensorValue,
    pub unit: String,
    pub dec_precision: usize,
}

pub fn sensor_type_label(sensor_type: i64) -> String {
    let label = match sensor_type {
        1 => "Line Power Meter",
        8 => "Outlet Power Meter",
        9 => "Residual Current Meter",
        12 => "RCMB Module",
        20 => "System Data",
        51 => "Temperature",
        52 => "Temp/Humidity",
        53 => "Temp/Humidity/Pressure",
        101 => "eFuses Bank Sensor",
        102 => "DC Power Source",
        664 => "Voltage/Current Meter",
        665 => "Temperature/Humidity Sensor",
        _ => return format!("Sensor Type {}", sensor_type),
    };

    label.to_string()
}

/// Derives all sensor readings of a status document.
///
/// Descriptors are matched to value entries by sensor type. A descriptor without
/// values, or an instance without a value row, contributes nothing.
pub fn flatten(doc: &StatusDocument) -> SensorMap {
    let mut result = SensorMap::new();

    let (Some(descriptions), Some(_)) = (&doc.sensor_descr, &doc.sensor_values) else {
        return result;
    };

    for descr in descriptions {
        let Some(values) = doc.values_for_type(descr.sensor_type) else {
            continue;
        };

        let instances = descr.instance_count().min(values.values.len());

        for instance in 0..instances {
            let Some(row) = values.row(instance) else {
                continue;
            };

            let property = descr.properties.get(instance);
            let sensor_id = match property.and_then(|p| p.id.as_deref()) {
                Some(raw) => SensorId::parse(raw),
                None => SensorId::Unrecognized(instance.to_string()),
            };
            let label = property.and_then(|p| p.name.clone());

            for (field_index, field) in descr.fields.iter().enumerate() {
                let value = row
                    .get(field_index)
                    .map(|cell| SensorValue::from_json(&cell.v))
                    .unwrap_or(SensorValue::Missing);

                let reading = new_reading(descr, field, field_index, &sensor_id, label.clone(), value);
                insert_unique(&mut result, reading);
            }
        }
    }

    result
}

fn new_reading(
    descr: &SensorDescription,
    field: &SensorField,
    field_index: usize,
    sensor_id: &SensorId,
    label: Option<String>,
    value: SensorValue,
) -> SensorReading {
    let key = format!(
        "{}{sep}{}{sep}{}{sep}{}",
        KEY_PREFIX,
        descr.sensor_type.to_string().replace('-', "m"),
        sensor_id.key_segment(),
        field_key_segment(&field.name, field_index),
        sep = KEY_SEPARATOR
    );

    let dec_precision = field
        .dec_precision
        .and_then(|p| usize::try_from(p).ok())
        .unwrap_or(0)
        .min(MAX_DEC_PRECISION);

    SensorReading {
        key,
        sensor_id: sensor_id.clone(),
        sensor_name: sensor_id.display_name(),
        label,
        field_name: field.name.clone(),
        sensor_type: descr.sensor_type,
        type_name: sensor_type_label(descr.sensor_type),
        value,
        unit: field.unit.clone(),
        dec_precision,
    }
}

/// Keys only collide for malformed descriptors (duplicate ids or field names that
/// sanitize to the same text). The later reading gets a numeric suffix, which is
/// deterministic for a given document.
fn insert_unique(map: &mut SensorMap, mut reading: SensorReading) {
    if map.contains_key(&reading.key) {
        let base = reading.key.clone();
        let mut n = 2;
        while map.contains_key(&format!("{}{}{}", base, KEY_SEPARATOR, n)) {
            n += 1;
        }
        reading.key = format!("{}{}{}", base, KEY_SEPARATOR, n);
    }

    map.insert(reading.key.clone(), reading);
}

fn field_key_segment(name: &str, field_index: usize) -> String {
    let segment: String = name
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '.')
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if segment.is_empty() {
        format!("field{}", field_index)
    } else {
        segment
    }
}

fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

impl SensorId {
    /// Recognizes `"<sensor>:...- I<input>"` and `"<sensor>:..."`.
    pub fn parse(raw: &str) -> Self {
        let Some((sensor, rest)) = raw.split_once(':') else {
            return SensorId::Unrecognized(raw.to_owned());
        };

        if !is_number(sensor) {
            return SensorId::Unrecognized(raw.to_owned());
        }

        if let Some(pos) = rest.rfind("- I") {
            let input = &rest[pos + 3..];
            if is_number(input) {
                return SensorId::WithInput {
                    sensor: sensor.to_owned(),
                    input: input.to_owned(),
                };
            }
        }

        SensorId::Sensor {
            sensor: sensor.to_owned(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            SensorId::WithInput { sensor, input } => format!("{} Input {}", sensor, input),
            SensorId::Sensor { sensor } => sensor.clone(),
            SensorId::Unrecognized(raw) => raw.clone(),
        }
    }

    pub fn input(&self) -> Option<&str> {
        match self {
            SensorId::WithInput { input, .. } => Some(input),
            _ => None,
        }
    }

    pub fn key_segment(&self) -> String {
        match self {
            SensorId::WithInput { sensor, input } => format!("{}{}input{}", sensor, KEY_SEPARATOR, input),
            SensorId::Sensor { sensor } => sensor.clone(),
            SensorId::Unrecognized(raw) => sanitize_identifier(raw),
        }
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl SensorValue {
    fn from_json(v: &Value) -> Self {
        match v {
            Value::Number(n) => n.as_f64().map(SensorValue::Number).unwrap_or(SensorValue::Missing),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => SensorValue::Number(number),
                _ => SensorValue::Text(s.clone()),
            },
            _ => SensorValue::Missing,
        }
    }

    /// Numeric value, `NaN` when the device reported none.
    pub fn as_f64(&self) -> f64 {
        match self {
            SensorValue::Number(n) => *n,
            _ => f64::NAN,
        }
    }
}

/// Renders textual degree units with the degree sign: `deg C` becomes `°C`.
pub fn sanitize_unit(unit: &str) -> String {
    let trimmed = unit.trim();

    if trimmed.eq_ignore_ascii_case("deg") {
        return "°".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("deg ") => format!("°{}", trimmed[4..].trim_start()),
        _ => unit.to_string(),
    }
}

impl SensorReading {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.sensor_name, self.field_name).trim().to_string()
    }

    pub fn display_unit(&self) -> String {
        sanitize_unit(&self.unit)
    }

    /// Value with exactly `dec_precision` fractional digits, or the device's text /
    /// `N/A` when there is no number.
    pub fn formatted_value(&self) -> String {
        match &self.value {
            SensorValue::Number(n) => format!("{:.*}", self.dec_precision, n),
            SensorValue::Text(text) => text.clone(),
            SensorValue::Missing => "N/A".to_string(),
        }
    }

    pub fn display_value(&self) -> String {
        let unit = self.display_unit();

        match (&self.value, unit.is_empty()) {
            (SensorValue::Number(_), false) => format!("{} {}", self.formatted_value(), unit),
            _ => self.formatted_value(),
        }
    }
}
