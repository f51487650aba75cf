use derive_more::derive::{Display, Error};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Full status payload of `/statusjsn.js`.
///
/// The device omits whole sections depending on the requested components and
/// firmware, and occasionally reports `null` where a list is expected. Every
/// field is therefore defaulted here so nothing downstream deals with
/// loosely-typed JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: Vec<Outlet>,
    #[serde(default)]
    pub sensor_descr: Option<Vec<SensorDescription>>,
    #[serde(default)]
    pub sensor_values: Option<Vec<SensorValues>>,
    #[serde(default)]
    pub misc: Option<DeviceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Outlet {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub state: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorDescription {
    #[serde(rename = "type", default, deserialize_with = "lenient_i64")]
    pub sensor_type: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub num: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<SensorField>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<SensorProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorField {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: String,
    #[serde(rename = "decPrecision", default, deserialize_with = "lenient_opt_i64")]
    pub dec_precision: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorProperty {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorValues {
    #[serde(rename = "type", default, deserialize_with = "lenient_i64")]
    pub sensor_type: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<Option<Vec<FieldValue>>>,
}

/// One `{v: ...}` cell of a sensor value row. `v` is kept as JSON because the
/// device reports numbers, numeric strings or plain text here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValue {
    pub v: Value,
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = match Value::deserialize(deserializer)? {
            Value::Object(mut cell) => cell.remove("v").unwrap_or_default(),
            bare @ (Value::Number(_) | Value::String(_)) => bare,
            _ => Value::Null,
        };

        Ok(FieldValue { v })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub firm_v: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub uptime: Option<i64>,
}

impl StatusDocument {
    /// Looks up an outlet by its 1-based public number.
    pub fn outlet(&self, number: u32) -> Option<&Outlet> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.outputs.get(index)
    }

    pub fn values_for_type(&self, sensor_type: i64) -> Option<&SensorValues> {
        self.sensor_values
            .as_ref()?
            .iter()
            .find(|values| values.sensor_type == sensor_type)
    }
}

impl Outlet {
    pub fn is_on(&self) -> bool {
        self.state == 1
    }

    pub fn is_off(&self) -> bool {
        self.state == 0
    }
}

impl SensorValues {
    pub fn row(&self, instance: usize) -> Option<&[FieldValue]> {
        self.values.get(instance)?.as_deref()
    }
}

impl SensorDescription {
    /// Number of sensor instances, falling back to the property list when `num` is absent.
    pub fn instance_count(&self) -> usize {
        match self.num {
            Some(num) => usize::try_from(num).unwrap_or(0),
            None => self.properties.len(),
        }
    }
}

//
// OUTLET SELECTION
//

pub const ALL_OUTLETS_ID: i64 = -1;

/// Outlet addressed by a device command. The host encodes "all outlets" as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i64")]
pub enum OutletSelector {
    All,
    Outlet(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum OutletSelectorError {
    #[display("Invalid outlet number {number}")]
    Invalid { number: i64 },
}

impl TryFrom<i64> for OutletSelector {
    type Error = OutletSelectorError;

    fn try_from(number: i64) -> Result<Self, Self::Error> {
        if number == ALL_OUTLETS_ID {
            return Ok(OutletSelector::All);
        }

        match u32::try_from(number) {
            Ok(outlet) if outlet >= 1 => Ok(OutletSelector::Outlet(outlet)),
            _ => Err(OutletSelectorError::Invalid { number }),
        }
    }
}

impl From<OutletSelector> for i64 {
    fn from(value: OutletSelector) -> Self {
        match value {
            OutletSelector::All => ALL_OUTLETS_ID,
            OutletSelector::Outlet(outlet) => outlet as i64,
        }
    }
}

impl std::fmt::Display for OutletSelector {
    /// Renders the `p` parameter of device commands.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutletSelector::All => write!(f, "all"),
            OutletSelector::Outlet(outlet) => write!(f, "{}", outlet),
        }
    }
}

//
// LENIENT DESERIALIZERS
//

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_as_i64(&Value::deserialize(deserializer)?))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_as_i64(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(*b as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_document() {
        let doc: StatusDocument = serde_json::from_value(json!({
            "outputs": [{ "name": "Camera", "state": 1 }]
        }))
        .unwrap();

        assert_eq!(doc.outputs.len(), 1);
        assert_eq!(doc.outputs[0].name.as_deref(), Some("Camera"));
        assert!(doc.outputs[0].is_on());
        assert!(doc.sensor_descr.is_none());
        assert!(doc.sensor_values.is_none());
        assert!(doc.misc.is_none());
    }

    #[test]
    fn tolerates_nulls_and_loose_types() {
        let doc: StatusDocument = serde_json::from_value(json!({
            "outputs": null,
            "sensor_descr": [{
                "type": "51",
                "fields": null,
                "properties": [{ "id": 7, "name": null }],
                "options": {}
            }],
            "misc": { "hostname": "pdu-rack-1", "firm_v": "1.4.2", "uptime": 3600.0, "build": 99 }
        }))
        .unwrap();

        assert!(doc.outputs.is_empty());

        let descr = &doc.sensor_descr.as_ref().unwrap()[0];
        assert_eq!(descr.sensor_type, 51);
        assert!(descr.fields.is_empty());
        assert_eq!(descr.properties[0].id.as_deref(), Some("7"));
        assert_eq!(descr.instance_count(), 1);

        let misc = doc.misc.unwrap();
        assert_eq!(misc.hostname.as_deref(), Some("pdu-rack-1"));
        assert_eq!(misc.uptime, Some(3600));
    }

    #[test]
    fn outlet_lookup_is_one_based() {
        let doc: StatusDocument = serde_json::from_value(json!({
            "outputs": [{ "name": "A", "state": 0 }, { "name": "B", "state": 1 }]
        }))
        .unwrap();

        assert_eq!(doc.outlet(0), None);
        assert_eq!(doc.outlet(1).and_then(|o| o.name.as_deref()), Some("A"));
        assert_eq!(doc.outlet(2).and_then(|o| o.name.as_deref()), Some("B"));
        assert_eq!(doc.outlet(3), None);
    }

    #[test]
    fn values_are_matched_by_type() {
        let doc: StatusDocument = serde_json::from_value(json!({
            "sensor_values": [
                { "type": 8, "values": [[{ "v": 1 }]] },
                { "type": 51, "values": [[{ "v": 21.5 }]] }
            ]
        }))
        .unwrap();

        assert_eq!(doc.values_for_type(51).map(|v| v.sensor_type), Some(51));
        assert!(doc.values_for_type(52).is_none());
    }

    #[test]
    fn value_rows_tolerate_nulls() {
        let values: SensorValues = serde_json::from_value(json!({
            "type": 52,
            "values": [[{ "v": 21.5 }, null, { "v": "n/a" }], null]
        }))
        .unwrap();

        let row = values.row(0).unwrap();
        assert_eq!(row[0].v, json!(21.5));
        assert_eq!(row[1].v, Value::Null);
        assert_eq!(row[2].v, json!("n/a"));
        assert!(values.row(1).is_none());
        assert!(values.row(2).is_none());
    }

    #[test]
    fn outlet_selector_from_host_id() {
        assert_eq!(OutletSelector::try_from(-1), Ok(OutletSelector::All));
        assert_eq!(OutletSelector::try_from(4), Ok(OutletSelector::Outlet(4)));
        assert_eq!(
            OutletSelector::try_from(0),
            Err(OutletSelectorError::Invalid { number: 0 })
        );
        assert_eq!(
            OutletSelector::try_from(-7),
            Err(OutletSelectorError::Invalid { number: -7 })
        );
    }

    #[test]
    fn outlet_selector_as_command_parameter() {
        assert_eq!(OutletSelector::All.to_string(), "all");
        assert_eq!(OutletSelector::Outlet(12).to_string(), "12");
    }
}
