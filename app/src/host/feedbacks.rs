use derive_more::Display;
use serde::Serialize;

use super::actions::OptionField;
use crate::pdu::StatusDocument;
use crate::status::OutletChoices;

const WHITE: u32 = 0xFFFFFF;
const GREEN: u32 = 0x00CC00;
const RED: u32 = 0xCC0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum FeedbackId {
    #[display("outlet_state")]
    #[serde(rename = "outlet_state")]
    OutletOn,
    #[display("outlet_state_off")]
    #[serde(rename = "outlet_state_off")]
    OutletOff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackStyle {
    pub color: u32,
    pub bgcolor: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackDefinition {
    pub feedback_id: FeedbackId,
    #[serde(rename = "type")]
    pub feedback_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionField>,
    pub default_style: FeedbackStyle,
}

impl FeedbackId {
    pub const ALL: [FeedbackId; 2] = [FeedbackId::OutletOn, FeedbackId::OutletOff];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.to_string() == id)
    }

    /// False for outlets the snapshot does not contain.
    pub fn evaluate(&self, doc: Option<&StatusDocument>, outlet: i64) -> bool {
        let Some(outlet) = u32::try_from(outlet).ok().and_then(|n| doc?.outlet(n)) else {
            return false;
        };

        match self {
            FeedbackId::OutletOn => outlet.is_on(),
            FeedbackId::OutletOff => outlet.is_off(),
        }
    }
}

pub fn definitions(choices: &OutletChoices) -> Vec<FeedbackDefinition> {
    let outlet_option = || OptionField::outlet_dropdown(&choices.outlets, choices.default_outlet());

    vec![
        FeedbackDefinition {
            feedback_id: FeedbackId::OutletOn,
            feedback_type: "boolean",
            name: "Outlet ON State",
            description: "Indicates if the selected outlet is currently ON",
            options: vec![outlet_option()],
            default_style: FeedbackStyle {
                color: WHITE,
                bgcolor: GREEN,
            },
        },
        FeedbackDefinition {
            feedback_id: FeedbackId::OutletOff,
            feedback_type: "boolean",
            name: "Outlet OFF State",
            description: "Indicates if the selected outlet is currently OFF",
            options: vec![outlet_option()],
            default_style: FeedbackStyle {
                color: WHITE,
                bgcolor: RED,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> StatusDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn camera_outlet_is_on() {
        let doc = doc(json!({ "outputs": [{ "name": "Camera", "state": 1 }] }));

        assert!(FeedbackId::OutletOn.evaluate(Some(&doc), 1));
        assert!(!FeedbackId::OutletOff.evaluate(Some(&doc), 1));
    }

    #[test]
    fn unknown_outlet_is_neither_on_nor_off() {
        let doc = doc(json!({ "outputs": [{ "name": "Camera", "state": 0 }] }));

        for outlet in [-1, 0, 2] {
            assert!(!FeedbackId::OutletOn.evaluate(Some(&doc), outlet));
            assert!(!FeedbackId::OutletOff.evaluate(Some(&doc), outlet));
        }
        assert!(!FeedbackId::OutletOff.evaluate(None, 1));
    }

    #[test]
    fn parses_host_ids() {
        assert_eq!(FeedbackId::from_id("outlet_state"), Some(FeedbackId::OutletOn));
        assert_eq!(FeedbackId::from_id("outlet_state_off"), Some(FeedbackId::OutletOff));
        assert_eq!(FeedbackId::from_id("outlet_power"), None);
    }

    #[test]
    fn definitions_use_outlets_without_all() {
        let doc = doc(json!({ "outputs": [{ "name": "Camera", "state": 1 }] }));
        let choices = OutletChoices::from_snapshot(Some(&doc));

        let defs = definitions(&choices);

        let value = serde_json::to_value(&defs[0]).unwrap();
        assert_eq!(value["feedback_id"], json!("outlet_state"));
        assert_eq!(value["options"][0]["choices"], json!([{ "id": 1, "label": "1 - Camera" }]));
        assert_eq!(value["default_style"]["bgcolor"], json!(0x00CC00));
    }
}
