use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::api::HostApiError;
use crate::commander::{CommandOutcome, OutletCommander, PowerAction};
use crate::pdu::OutletSelector;
use crate::status::{OutletChoice, OutletChoices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    #[display("turn_on_outlet")]
    TurnOnOutlet,
    #[display("turn_off_outlet")]
    TurnOffOutlet,
    #[display("toggle_outlet")]
    ToggleOutlet,
    #[display("reset_outlet")]
    ResetOutlet,
    #[display("batch_outlets")]
    BatchOutlets,
    #[display("cancel_batch")]
    CancelBatch,
}

/// Input field shown by the host for an action or feedback option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptionField {
    Dropdown {
        id: &'static str,
        label: &'static str,
        default: i64,
        choices: Vec<OutletChoice>,
    },
    Number {
        id: &'static str,
        label: &'static str,
        default: i64,
        min: i64,
        max: i64,
    },
    Textinput {
        id: &'static str,
        label: &'static str,
        default: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDefinition {
    pub action_id: ActionId,
    pub name: &'static str,
    pub options: Vec<OptionField>,
}

/// Option values sent by the host when an action is triggered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionOptions {
    pub outlet: Option<i64>,
    pub start_outlet: Option<i64>,
    #[serde(default)]
    pub delay_seconds: i64,
    pub states: Option<BatchStates>,
}

/// Batch states either as a list (`[1, 0, 1]`) or as the text typed into the
/// host's input field (`"1,0,1"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchStates {
    List(Vec<i64>),
    Text(String),
}

impl ActionId {
    pub const ALL: [ActionId; 6] = [
        ActionId::TurnOnOutlet,
        ActionId::TurnOffOutlet,
        ActionId::ToggleOutlet,
        ActionId::ResetOutlet,
        ActionId::BatchOutlets,
        ActionId::CancelBatch,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.to_string() == id)
    }

    fn power_action(&self) -> Option<PowerAction> {
        match self {
            ActionId::TurnOnOutlet => Some(PowerAction::On),
            ActionId::TurnOffOutlet => Some(PowerAction::Off),
            ActionId::ToggleOutlet => Some(PowerAction::Toggle),
            ActionId::ResetOutlet => Some(PowerAction::Reset),
            ActionId::BatchOutlets | ActionId::CancelBatch => None,
        }
    }
}

impl OptionField {
    pub fn outlet_dropdown(choices: &[OutletChoice], default: i64) -> Self {
        OptionField::Dropdown {
            id: "outlet",
            label: "Outlet",
            default,
            choices: choices.to_vec(),
        }
    }
}

pub fn definitions(choices: &OutletChoices) -> Vec<ActionDefinition> {
    let with_all = || OptionField::outlet_dropdown(&choices.outlets_with_all, choices.default_outlet());
    let without_all = || OptionField::outlet_dropdown(&choices.outlets, choices.default_outlet());

    vec![
        ActionDefinition {
            action_id: ActionId::TurnOnOutlet,
            name: "Turn ON Outlet",
            options: vec![with_all()],
        },
        ActionDefinition {
            action_id: ActionId::TurnOffOutlet,
            name: "Turn OFF Outlet",
            options: vec![with_all()],
        },
        ActionDefinition {
            action_id: ActionId::ToggleOutlet,
            name: "Toggle Outlet",
            options: vec![without_all()],
        },
        ActionDefinition {
            action_id: ActionId::ResetOutlet,
            name: "Reset Outlet",
            options: vec![with_all()],
        },
        ActionDefinition {
            action_id: ActionId::BatchOutlets,
            name: "Batch Switch Outlets",
            options: vec![
                OptionField::Number {
                    id: "start_outlet",
                    label: "Start Outlet",
                    default: 1,
                    min: 1,
                    max: choices.outlets.len().max(1) as i64,
                },
                OptionField::Number {
                    id: "delay_seconds",
                    label: "Delay (seconds)",
                    default: 1,
                    min: 0,
                    max: 3600,
                },
                OptionField::Textinput {
                    id: "states",
                    label: "States (1 = on, 0 = off, comma separated)",
                    default: "1".to_string(),
                },
            ],
        },
        ActionDefinition {
            action_id: ActionId::CancelBatch,
            name: "Cancel Batch",
            options: vec![without_all()],
        },
    ]
}

pub async fn run_action(
    commander: &OutletCommander,
    action: ActionId,
    options: &ActionOptions,
) -> Result<CommandOutcome, HostApiError> {
    if let Some(power_action) = action.power_action() {
        let outlet = options.outlet_selector()?;
        return Ok(commander.execute(power_action, outlet).await);
    }

    match action {
        ActionId::BatchOutlets => {
            let start = positive(options.start_outlet, "start_outlet")?;
            let delay = u32::try_from(options.delay_seconds).map_err(|_| HostApiError::InvalidOptions {
                message: format!("Invalid delay_seconds {}", options.delay_seconds),
            })?;
            let states = options.batch_states()?;

            commander
                .batch_set_outlets(start, delay, &states)
                .await
                .map_err(HostApiError::device_failure)?;
        }
        ActionId::CancelBatch => {
            let outlet = positive(options.outlet, "outlet")?;

            commander
                .cancel_batch(outlet)
                .await
                .map_err(HostApiError::device_failure)?;
        }
        _ => {}
    }

    Ok(CommandOutcome::Sent)
}

fn positive(value: Option<i64>, name: &str) -> Result<u32, HostApiError> {
    let value = value.ok_or_else(|| HostApiError::InvalidOptions {
        message: format!("Missing option {}", name),
    })?;

    match u32::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(HostApiError::InvalidOptions {
            message: format!("Invalid {} {}", name, value),
        }),
    }
}

impl ActionOptions {
    fn outlet_selector(&self) -> Result<OutletSelector, HostApiError> {
        let outlet = self.outlet.ok_or_else(|| HostApiError::InvalidOptions {
            message: "Missing option outlet".to_string(),
        })?;

        OutletSelector::try_from(outlet).map_err(|e| HostApiError::InvalidOptions { message: e.to_string() })
    }

    fn batch_states(&self) -> Result<Vec<bool>, HostApiError> {
        let raw: Vec<String> = match &self.states {
            Some(BatchStates::List(list)) => list.iter().map(|s| s.to_string()).collect(),
            Some(BatchStates::Text(text)) => text
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![],
        };

        if raw.is_empty() {
            return Err(HostApiError::InvalidOptions {
                message: "Missing option states".to_string(),
            });
        }

        raw.iter()
            .map(|s| match s.as_str() {
                "1" => Ok(true),
                "0" => Ok(false),
                other => Err(HostApiError::InvalidOptions {
                    message: format!("Invalid outlet state {}", other),
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::PduHttpClient;
    use crate::status::StatusReconciler;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn options(value: serde_json::Value) -> ActionOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_host_ids() {
        for action in ActionId::ALL {
            assert_eq!(ActionId::from_id(&action.to_string()), Some(action));
        }
        assert_eq!(ActionId::from_id("explode_outlet"), None);
    }

    #[test]
    fn toggle_offers_no_all_outlets_entry() {
        let doc = serde_json::from_value(json!({ "outputs": [{ "name": "Camera", "state": 1 }] })).unwrap();
        let choices = OutletChoices::from_snapshot(Some(&doc));

        let defs = serde_json::to_value(definitions(&choices)).unwrap();

        assert_eq!(defs[0]["action_id"], json!("turn_on_outlet"));
        assert_eq!(defs[0]["options"][0]["choices"][0], json!({ "id": -1, "label": "All Outlets" }));
        assert_eq!(defs[2]["action_id"], json!("toggle_outlet"));
        assert_eq!(defs[2]["options"][0]["choices"], json!([{ "id": 1, "label": "1 - Camera" }]));
        assert_eq!(defs[2]["options"][0]["type"], json!("dropdown"));
    }

    #[test]
    fn batch_states_from_list_or_text() {
        let from_list = options(json!({ "states": [1, 0, 1] }));
        let from_text = options(json!({ "states": "1, 0,1" }));

        assert_eq!(from_list.batch_states().unwrap(), vec![true, false, true]);
        assert_eq!(from_text.batch_states().unwrap(), vec![true, false, true]);
        assert!(options(json!({ "states": "1,2" })).batch_states().is_err());
        assert!(options(json!({})).batch_states().is_err());
    }

    #[test]
    fn outlet_option_is_validated() {
        assert_eq!(options(json!({ "outlet": -1 })).outlet_selector().unwrap(), OutletSelector::All);
        assert!(options(json!({ "outlet": 0 })).outlet_selector().is_err());
        assert!(options(json!({})).outlet_selector().is_err());
    }

    #[tokio::test]
    async fn runs_batch_action() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cmd".into(), "5".into()),
                Matcher::UrlEncoded("p".into(), "1".into()),
                Matcher::UrlEncoded("s".into(), "5".into()),
                Matcher::UrlEncoded("a1".into(), "1".into()),
                Matcher::UrlEncoded("a2".into(), "0".into()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let client = PduHttpClient::new(&server.url(), None).unwrap();
        let commander = OutletCommander::new(client, StatusReconciler::new().reader());

        let outcome = run_action(
            &commander,
            ActionId::BatchOutlets,
            &options(json!({ "start_outlet": 1, "delay_seconds": 5, "states": [1, 0] })),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome, CommandOutcome::Sent);
    }

    #[tokio::test]
    async fn cancel_batch_failure_is_device_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = PduHttpClient::new(&server.url(), None).unwrap();
        let commander = OutletCommander::new(client, StatusReconciler::new().reader());

        let result = run_action(&commander, ActionId::CancelBatch, &options(json!({ "outlet": 2 }))).await;

        assert!(matches!(result, Err(HostApiError::DeviceFailure { .. })));
    }
}
