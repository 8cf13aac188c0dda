use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{CurvePoint, Gender, Household, SimulationParameters, income_curve};
use crate::error::SimError;
use crate::session::{MemberUpdate, ParameterUpdate, PassOutcome, Simulator};

const DEFAULT_CURVE_MAX_INCOME: f64 = 50_000_000.0;
const DEFAULT_CURVE_POINTS: u32 = 100;
const MAX_CURVE_POINTS: u32 = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ParametersPayload {
    alpha: Option<f64>,
    #[serde(alias = "child")]
    child_weight: Option<f64>,
    #[serde(alias = "elder")]
    elder_weight: Option<f64>,
    #[serde(alias = "couple", alias = "multiPerson")]
    multi_person_weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MemberPayload {
    name: Option<String>,
    age: Option<String>,
    income: Option<String>,
    gender: Option<Gender>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CurveQuery {
    alpha: Option<f64>,
    max_income: Option<f64>,
    points: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetSummary {
    persons: usize,
    actual_total: f64,
    minimum_income_total: f64,
    income_actual_total: f64,
    allowance_actual_total: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    parameters: SimulationParameters,
    gamma: f64,
    dataset: DatasetSummary,
    households: Vec<Household>,
    outcome: Option<PassOutcome>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParametersResponse {
    gamma: f64,
    parameters: SimulationParameters,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultsResponse {
    gamma: f64,
    outcome: Option<PassOutcome>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurveResponse {
    alpha: f64,
    max_income: f64,
    points: Vec<CurvePoint>,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Rejects non-finite numbers up front; everything else is a legal slider
/// position.
fn parameter_update_from_payload(payload: ParametersPayload) -> Result<ParameterUpdate, String> {
    for (name, value) in [
        ("alpha", payload.alpha),
        ("childWeight", payload.child_weight),
        ("elderWeight", payload.elder_weight),
        ("multiPersonWeight", payload.multi_person_weight),
    ] {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite number"));
            }
        }
    }
    Ok(ParameterUpdate {
        alpha: payload.alpha,
        child_weight: payload.child_weight,
        elder_weight: payload.elder_weight,
        multi_person_weight: payload.multi_person_weight,
    })
}

fn member_update_from_payload(payload: MemberPayload) -> MemberUpdate {
    MemberUpdate {
        name: payload.name,
        age: payload.age,
        income: payload.income,
        gender: payload.gender,
    }
}

/// Resolves curve query defaults against the session alpha and bounds the
/// sample count.
fn curve_request_from_query(
    query: &CurveQuery,
    session_alpha: f64,
) -> Result<(f64, f64, u32), String> {
    let alpha = query.alpha.unwrap_or(session_alpha);
    if !alpha.is_finite() || alpha <= 0.0 {
        return Err("alpha must be a positive number".to_string());
    }
    let max_income = query.max_income.unwrap_or(DEFAULT_CURVE_MAX_INCOME);
    if !max_income.is_finite() || max_income <= 0.0 {
        return Err("maxIncome must be a positive number".to_string());
    }
    let points = query.points.unwrap_or(DEFAULT_CURVE_POINTS);
    if points == 0 || points > MAX_CURVE_POINTS {
        return Err(format!("points must be between 1 and {MAX_CURVE_POINTS}"));
    }
    Ok((alpha, max_income, points))
}

pub async fn run_http_server(simulator: Simulator, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/state", get(state_handler))
        .route("/api/parameters", post(parameters_handler))
        .route("/api/households", post(add_household_handler))
        .route(
            "/api/households/:household_id",
            delete(remove_household_handler),
        )
        .route(
            "/api/households/:household_id/members",
            post(add_member_handler),
        )
        .route(
            "/api/households/:household_id/members/:member_id",
            patch(update_member_handler).delete(remove_member_handler),
        )
        .route("/api/results", get(results_handler))
        .route("/api/curve", get(curve_handler))
        .fallback(not_found_handler)
        .with_state(simulator);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "simulator API listening");

    axum::serve(listener, app).await
}

async fn state_handler(State(simulator): State<Simulator>) -> Response {
    let snapshot = simulator.snapshot().await;
    let totals = simulator.reference().totals;
    let response = StateResponse {
        parameters: snapshot.parameters,
        gamma: snapshot.gamma,
        dataset: DatasetSummary {
            persons: simulator.reference().persons.len(),
            actual_total: totals.actual_total,
            minimum_income_total: totals.minimum_income_total,
            income_actual_total: totals.income_actual_total,
            allowance_actual_total: totals.allowance_actual_total,
        },
        households: snapshot.households,
        outcome: snapshot.outcome,
    };
    json_response(StatusCode::OK, response)
}

async fn parameters_handler(
    State(simulator): State<Simulator>,
    Json(payload): Json<ParametersPayload>,
) -> Response {
    match parameter_update_from_payload(payload) {
        Ok(update) => {
            let (parameters, gamma) = simulator.update_parameters(update).await;
            json_response(StatusCode::OK, ParametersResponse { gamma, parameters })
        }
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn add_household_handler(State(simulator): State<Simulator>) -> Response {
    let household = simulator.add_household().await;
    json_response(StatusCode::OK, household)
}

async fn remove_household_handler(
    State(simulator): State<Simulator>,
    Path(household_id): Path<u64>,
) -> Response {
    match simulator.remove_household(household_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            RemovedResponse {
                removed: household_id,
            },
        ),
        Err(error) => session_error_response(&error),
    }
}

async fn add_member_handler(
    State(simulator): State<Simulator>,
    Path(household_id): Path<u64>,
) -> Response {
    match simulator.add_member(household_id).await {
        Ok(member) => json_response(StatusCode::OK, member),
        Err(error) => session_error_response(&error),
    }
}

async fn update_member_handler(
    State(simulator): State<Simulator>,
    Path((household_id, member_id)): Path<(u64, u64)>,
    Json(payload): Json<MemberPayload>,
) -> Response {
    match simulator
        .update_member(household_id, member_id, member_update_from_payload(payload))
        .await
    {
        Ok(member) => json_response(StatusCode::OK, member),
        Err(error) => session_error_response(&error),
    }
}

async fn remove_member_handler(
    State(simulator): State<Simulator>,
    Path((household_id, member_id)): Path<(u64, u64)>,
) -> Response {
    match simulator.remove_member(household_id, member_id).await {
        Ok(()) => json_response(StatusCode::OK, RemovedResponse { removed: member_id }),
        Err(error) => session_error_response(&error),
    }
}

async fn results_handler(State(simulator): State<Simulator>) -> Response {
    let (gamma, outcome) = simulator.results().await;
    json_response(StatusCode::OK, ResultsResponse { gamma, outcome })
}

async fn curve_handler(
    State(simulator): State<Simulator>,
    Query(query): Query<CurveQuery>,
) -> Response {
    let (params, _) = simulator.parameters().await;
    match curve_request_from_query(&query, params.alpha) {
        Ok((alpha, max_income, points)) => json_response(
            StatusCode::OK,
            CurveResponse {
                alpha,
                max_income,
                points: income_curve(alpha, max_income, points),
            },
        ),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn session_error_response(error: &SimError) -> Response {
    let status = match error {
        SimError::UnknownHousehold { .. } | SimError::UnknownMember { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    error_response(status, &error.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn parameter_update_from_json(json: &str) -> Result<ParameterUpdate, String> {
    let payload = serde_json::from_str::<ParametersPayload>(json)
        .map_err(|e| format!("Invalid parameters payload: {e}"))?;
    parameter_update_from_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HouseholdResult;

    #[test]
    fn parameter_payload_parses_camel_case_keys() {
        let update = parameter_update_from_json(r#"{"alpha": 0.7, "childWeight": 0.4}"#)
            .expect("payload should parse");
        assert_eq!(update.alpha, Some(0.7));
        assert_eq!(update.child_weight, Some(0.4));
        assert_eq!(update.elder_weight, None);
        assert_eq!(update.multi_person_weight, None);
    }

    #[test]
    fn parameter_payload_accepts_short_aliases() {
        let update = parameter_update_from_json(r#"{"child": 0.1, "elder": 0.2, "couple": 0.3}"#)
            .expect("payload should parse");
        assert_eq!(update.child_weight, Some(0.1));
        assert_eq!(update.elder_weight, Some(0.2));
        assert_eq!(update.multi_person_weight, Some(0.3));

        let multi = parameter_update_from_json(r#"{"multiPerson": 0.9}"#)
            .expect("payload should parse");
        assert_eq!(multi.multi_person_weight, Some(0.9));
    }

    #[test]
    fn empty_parameter_payload_changes_nothing() {
        let update = parameter_update_from_json("{}").expect("payload should parse");
        assert!(update.alpha.is_none());
        assert!(update.child_weight.is_none());
        assert!(update.elder_weight.is_none());
        assert!(update.multi_person_weight.is_none());
    }

    #[test]
    fn non_finite_parameters_are_rejected_by_name() {
        let payload = ParametersPayload {
            alpha: Some(f64::NAN),
            ..ParametersPayload::default()
        };
        let err = parameter_update_from_payload(payload).expect_err("must reject NaN");
        assert!(err.contains("alpha"));

        let payload = ParametersPayload {
            elder_weight: Some(f64::INFINITY),
            ..ParametersPayload::default()
        };
        let err = parameter_update_from_payload(payload).expect_err("must reject infinity");
        assert!(err.contains("elderWeight"));
    }

    #[test]
    fn member_payload_parses_the_gender_vocabulary() {
        let payload: MemberPayload =
            serde_json::from_str(r#"{"age": "30", "income": "450", "gender": "other"}"#)
                .expect("payload should parse");
        let update = member_update_from_payload(payload);
        assert_eq!(update.age.as_deref(), Some("30"));
        assert_eq!(update.income.as_deref(), Some("450"));
        assert_eq!(update.gender, Some(Gender::Other));

        let partial: MemberPayload =
            serde_json::from_str(r#"{"name": "Aiko"}"#).expect("payload should parse");
        assert_eq!(partial.name.as_deref(), Some("Aiko"));
        assert!(partial.age.is_none());
    }

    #[test]
    fn curve_query_defaults_to_the_session_alpha() {
        let (alpha, max_income, points) =
            curve_request_from_query(&CurveQuery::default(), 0.85).expect("defaults are valid");
        assert_eq!(alpha, 0.85);
        assert_eq!(max_income, 50_000_000.0);
        assert_eq!(points, 100);

        let query = CurveQuery {
            alpha: Some(0.6),
            max_income: Some(20_000_000.0),
            points: Some(40),
        };
        let (alpha, max_income, points) =
            curve_request_from_query(&query, 0.85).expect("explicit values are valid");
        assert_eq!(alpha, 0.6);
        assert_eq!(max_income, 20_000_000.0);
        assert_eq!(points, 40);
    }

    #[test]
    fn curve_query_rejects_out_of_range_values() {
        let negative_alpha = CurveQuery {
            alpha: Some(-0.2),
            ..CurveQuery::default()
        };
        assert!(curve_request_from_query(&negative_alpha, 0.85).is_err());

        let zero_income = CurveQuery {
            max_income: Some(0.0),
            ..CurveQuery::default()
        };
        assert!(curve_request_from_query(&zero_income, 0.85).is_err());

        let zero_points = CurveQuery {
            points: Some(0),
            ..CurveQuery::default()
        };
        assert!(curve_request_from_query(&zero_points, 0.85).is_err());

        let too_many_points = CurveQuery {
            points: Some(5000),
            ..CurveQuery::default()
        };
        assert!(curve_request_from_query(&too_many_points, 0.85).is_err());
    }

    #[test]
    fn unknown_ids_map_to_not_found_responses() {
        let household = SimError::UnknownHousehold { id: 7 };
        assert_eq!(
            session_error_response(&household).status(),
            StatusCode::NOT_FOUND
        );

        let member = SimError::UnknownMember {
            household: 7,
            member: 3,
        };
        assert_eq!(session_error_response(&member).status(), StatusCode::NOT_FOUND);

        let lookup = SimError::LookupStatus {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "overloaded".to_string(),
        };
        assert_eq!(
            session_error_response(&lookup).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn results_response_serialization_contains_expected_fields() {
        let response = ResultsResponse {
            gamma: 0.5,
            outcome: Some(PassOutcome::default()),
        };
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"gamma\""));
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"errors\""));
    }

    #[test]
    fn state_response_serialization_contains_expected_fields() {
        let response = StateResponse {
            parameters: SimulationParameters::default(),
            gamma: 1.25,
            dataset: DatasetSummary {
                persons: 10_000,
                actual_total: 9.0e9,
                minimum_income_total: 4.0e9,
                income_actual_total: 7.0e9,
                allowance_actual_total: 2.0e9,
            },
            households: Vec::new(),
            outcome: None,
        };
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"alpha\""));
        assert!(json.contains("\"multiPerson\""));
        assert!(json.contains("\"persons\""));
        assert!(json.contains("\"actualTotal\""));
        assert!(json.contains("\"minimumIncomeTotal\""));
        assert!(json.contains("\"allowanceActualTotal\""));
        assert!(json.contains("\"households\""));
        assert!(json.contains("\"outcome\""));
    }

    #[test]
    fn outcome_keys_serialize_household_ids_as_strings() {
        let mut outcome = PassOutcome::default();
        outcome.results.insert(
            3,
            HouseholdResult {
                baseline_benefit: 60.0,
                surplus: 15.0,
                total: 75.0,
            },
        );
        let json = serde_json::to_string(&outcome).expect("outcome should serialize");
        assert!(json.contains("\"3\""));
        assert!(json.contains("\"baselineBenefit\""));
        assert!(json.contains("\"surplus\""));
        assert!(json.contains("\"total\""));
    }
}
