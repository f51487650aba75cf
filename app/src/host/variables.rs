use std::collections::BTreeMap;

use serde::Serialize;

use crate::pdu::StatusDocument;
use crate::status::{SensorMap, outlet_name};

pub type VariableValues = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub variable_id: String,
    pub name: String,
}

impl VariableDefinition {
    fn new(variable_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            variable_id: variable_id.into(),
            name: name.into(),
        }
    }
}

pub fn definitions(doc: Option<&StatusDocument>, sensors: &SensorMap) -> Vec<VariableDefinition> {
    let mut defs = vec![
        VariableDefinition::new("hostname", "Device Hostname"),
        VariableDefinition::new("firmware", "Firmware Version"),
        VariableDefinition::new("uptime", "Uptime (seconds)"),
        VariableDefinition::new("outlet_count", "Number of Outlets"),
    ];

    if let Some(doc) = doc {
        for n in 1..=doc.outputs.len() {
            defs.push(VariableDefinition::new(format!("outlet_{}_name", n), format!("Outlet {} Name", n)));
            defs.push(VariableDefinition::new(format!("outlet_{}_state", n), format!("Outlet {} State", n)));
        }
    }

    for (key, reading) in sensors {
        let name = reading.display_name();
        defs.push(VariableDefinition::new(format!("{}_name", key), format!("Sensor {} Name", name)));
        defs.push(VariableDefinition::new(format!("{}_value", key), format!("Sensor {} Value", name)));
        defs.push(VariableDefinition::new(format!("{}_unit", key), format!("Sensor {} Unit Value", name)));
    }

    defs
}

/// Current values for every defined variable that has data in the snapshot.
pub fn values(doc: Option<&StatusDocument>, sensors: &SensorMap) -> VariableValues {
    let mut values = VariableValues::new();

    let Some(doc) = doc else {
        return values;
    };

    if let Some(misc) = &doc.misc {
        values.insert("hostname".to_string(), misc.hostname.clone().unwrap_or_default());
        values.insert("firmware".to_string(), misc.firm_v.clone().unwrap_or_default());
        values.insert(
            "uptime".to_string(),
            misc.uptime.map(|u| u.to_string()).unwrap_or_default(),
        );
    }

    values.insert("outlet_count".to_string(), doc.outputs.len().to_string());
    for (i, outlet) in doc.outputs.iter().enumerate() {
        let state = if outlet.is_on() { "On" } else { "Off" };
        values.insert(format!("outlet_{}_name", i + 1), outlet_name(outlet));
        values.insert(format!("outlet_{}_state", i + 1), state.to_string());
    }

    for (key, reading) in sensors {
        values.insert(format!("{}_name", key), reading.display_name());
        values.insert(format!("{}_value", key), reading.formatted_value());
        values.insert(format!("{}_unit", key), reading.display_value());
    }

    values
}
