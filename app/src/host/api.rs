use actix_web::http::StatusCode;
use actix_web::web::{self, Json};
use actix_web::{HttpResponse, ResponseError};
use derive_more::derive::{Display, Error};
use serde::{Deserialize, Serialize};

use super::actions::{ActionId, ActionOptions, run_action};
use super::feedbacks::FeedbackId;
use super::registry::HostRegistry;
use super::status::ModuleStatusReporter;
use crate::commander::OutletCommander;
use crate::status::SensorReading;

type ApiResponse = Result<HttpResponse, HostApiError>;

#[derive(Clone)]
struct HostApiState {
    registry: HostRegistry,
    status: ModuleStatusReporter,
    commander: Option<OutletCommander>,
}

pub fn new_routes(
    registry: HostRegistry,
    status: ModuleStatusReporter,
    commander: Option<OutletCommander>,
) -> actix_web::Scope {
    let state = HostApiState {
        registry,
        status,
        commander,
    };

    web::scope("/api")
        .route("/status", web::get().to(get_status))
        .route("/actions", web::get().to(get_actions))
        .route("/actions/{action_id}", web::post().to(post_action))
        .route("/feedbacks", web::get().to(get_feedbacks))
        .route("/feedbacks/{feedback_id}", web::get().to(get_feedback_value))
        .route("/variables", web::get().to(get_variables))
        .route("/variables/values", web::get().to(get_variable_values))
        .route("/sensors", web::get().to(get_sensors))
        .app_data(web::Data::new(state))
}

#[derive(Debug, Display, Error)]
pub enum HostApiError {
    #[display("Unknown action {id}")]
    UnknownAction { id: String },

    #[display("Unknown feedback {id}")]
    UnknownFeedback { id: String },

    #[display("Invalid options: {message}")]
    InvalidOptions { message: String },

    #[display("Device request failed: {message}")]
    DeviceFailure { message: String },

    #[display("Module is not configured")]
    NotConfigured,
}

impl HostApiError {
    pub fn device_failure(e: anyhow::Error) -> Self {
        HostApiError::DeviceFailure {
            message: format!("{:#}", e),
        }
    }
}

impl ResponseError for HostApiError {
    fn status_code(&self) -> StatusCode {
        tracing::warn!("HostApiError: {:?}", self);

        match self {
            HostApiError::UnknownAction { .. } | HostApiError::UnknownFeedback { .. } => StatusCode::NOT_FOUND,
            HostApiError::InvalidOptions { .. } => StatusCode::BAD_REQUEST,
            HostApiError::DeviceFailure { .. } => StatusCode::BAD_GATEWAY,
            HostApiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorDTO {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorDTO {
    error: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackQuery {
    outlet: i64,
}

#[derive(Debug, Serialize)]
struct FeedbackValueDTO {
    feedback_id: FeedbackId,
    outlet: i64,
    value: bool,
}

#[derive(Debug, Serialize)]
struct SensorDTO<'a> {
    name: String,
    sensor_name: &'a str,
    input: Option<&'a str>,
    label: Option<&'a str>,
    field_name: &'a str,
    #[serde(rename = "type")]
    sensor_type: i64,
    type_name: &'a str,
    value: Option<f64>,
    formatted_value: String,
    unit: &'a str,
    display_unit: String,
    display_value: String,
    dec_precision: usize,
}

impl<'a> From<&'a SensorReading> for SensorDTO<'a> {
    fn from(reading: &'a SensorReading) -> Self {
        let value = reading.value.as_f64();

        Self {
            name: reading.display_name(),
            sensor_name: &reading.sensor_name,
            input: reading.sensor_id.input(),
            label: reading.label.as_deref(),
            field_name: &reading.field_name,
            sensor_type: reading.sensor_type,
            type_name: &reading.type_name,
            value: (!value.is_nan()).then_some(value),
            formatted_value: reading.formatted_value(),
            unit: &reading.unit,
            display_unit: reading.display_unit(),
            display_value: reading.display_value(),
            dec_precision: reading.dec_precision,
        }
    }
}

async fn get_status(state: web::Data<HostApiState>) -> HttpResponse {
    HttpResponse::Ok().json(state.status.current())
}

async fn get_actions(state: web::Data<HostApiState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.registry.current().actions)
}

async fn post_action(
    state: web::Data<HostApiState>,
    path: web::Path<String>,
    Json(options): Json<ActionOptions>,
) -> ApiResponse {
    let id = path.into_inner();
    let action = ActionId::from_id(&id).ok_or(HostApiError::UnknownAction { id })?;
    let commander = state.commander.as_ref().ok_or(HostApiError::NotConfigured)?;

    tracing::info!("Running action {} with {:?}", action, options);
    let outcome = run_action(commander, action, &options).await?;

    Ok(HttpResponse::Ok().json(outcome))
}

async fn get_feedbacks(state: web::Data<HostApiState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.registry.current().feedbacks)
}

async fn get_feedback_value(
    state: web::Data<HostApiState>,
    path: web::Path<String>,
    query: web::Query<FeedbackQuery>,
) -> ApiResponse {
    let id = path.into_inner();
    let feedback_id = FeedbackId::from_id(&id).ok_or(HostApiError::UnknownFeedback { id })?;

    let host_state = state.registry.current();
    let value = feedback_id.evaluate(host_state.snapshot.as_deref(), query.outlet);

    Ok(HttpResponse::Ok().json(FeedbackValueDTO {
        feedback_id,
        outlet: query.outlet,
        value,
    }))
}

async fn get_variables(state: web::Data<HostApiState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.registry.current().variable_definitions)
}

async fn get_variable_values(state: web::Data<HostApiState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.registry.current().variable_values)
}

async fn get_sensors(state: web::Data<HostApiState>) -> HttpResponse {
    let host_state = state.registry.current();
    let sensors: std::collections::BTreeMap<&str, SensorDTO> = host_state
        .sensors
        .iter()
        .map(|(key, reading)| (key.as_str(), SensorDTO::from(reading)))
        .collect();

    HttpResponse::Ok().json(sensors)
}
