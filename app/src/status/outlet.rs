use serde::Serialize;

use crate::pdu::{ALL_OUTLETS_ID, Outlet, StatusDocument};

const UNNAMED_OUTLET: &str = "Unnamed Outlet";
const ALL_OUTLETS_LABEL: &str = "All Outlets";
const NO_OUTLETS_LABEL: &str = "No outlets available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutletChoice {
    pub id: i64,
    pub label: String,
}

/// Dropdown entries offered to the host for outlet selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutletChoices {
    pub outlets: Vec<OutletChoice>,
    pub outlets_with_all: Vec<OutletChoice>,
}

impl OutletChoice {
    fn placeholder() -> Self {
        Self {
            id: 0,
            label: NO_OUTLETS_LABEL.to_string(),
        }
    }

    fn all_outlets() -> Self {
        Self {
            id: ALL_OUTLETS_ID,
            label: ALL_OUTLETS_LABEL.to_string(),
        }
    }
}

impl OutletChoices {
    pub fn from_snapshot(doc: Option<&StatusDocument>) -> Self {
        let outlets: Vec<OutletChoice> = doc
            .map(|doc| {
                doc.outputs
                    .iter()
                    .enumerate()
                    .map(|(i, outlet)| OutletChoice {
                        id: i as i64 + 1,
                        label: format!("{} - {}", i + 1, outlet_name(outlet)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if outlets.is_empty() {
            return Self {
                outlets: vec![OutletChoice::placeholder()],
                outlets_with_all: vec![OutletChoice::placeholder()],
            };
        }

        let mut outlets_with_all = Vec::with_capacity(outlets.len() + 1);
        outlets_with_all.push(OutletChoice::all_outlets());
        outlets_with_all.extend(outlets.iter().cloned());

        Self {
            outlets,
            outlets_with_all,
        }
    }

    /// First selectable entry, used as dropdown default.
    pub fn default_outlet(&self) -> i64 {
        self.outlets.first().map(|c| c.id).unwrap_or(0)
    }
}

/// Device-assigned outlet name, or a generic label for blank names.
pub fn outlet_name(outlet: &Outlet) -> String {
    match outlet.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNNAMED_OUTLET.to_string(),
    }
}
