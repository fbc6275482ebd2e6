use crate::errors::CoolsimError;
use crate::input::{Input, PolicyKind};
use crate::output::{MemoryOutput, SinkOutput};
use crate::{run_project, ExternalData, ProjectOptions, RequestOverrides};
use pretty_assertions::assert_eq;
use rstest::*;

#[fixture]
fn input_json() -> Vec<u8> {
    let mut input = Input::default();
    input.simulation.days = 2;
    input.request.n_runs = 6;
    serde_json::to_vec(&input).unwrap()
}

#[rstest]
fn test_run_project_writes_payload(input_json: Vec<u8>) {
    let output = MemoryOutput::default();
    let results = run_project(
        input_json.as_slice(),
        output.clone(),
        ExternalData::default(),
        &ProjectOptions::default(),
    )
    .unwrap();

    let payload = &results.payloads[&PolicyKind::Baseline];
    assert_eq!(payload.cost_samples.len(), 6);
    assert_eq!(payload.equipment_id, "eficiente");
    assert_eq!(payload.hourly_mean_ambient_temps.len(), 48);
    assert_eq!(payload.daily_max_room_temps.len(), 2);
    assert_eq!(payload.hour_of_day_cooling_fraction.len(), 24);
    assert_eq!(
        payload.cop_curves.keys().collect::<Vec<_>>(),
        vec!["economico", "eficiente", "premium"]
    );
    assert_eq!(payload.cop_curves["eficiente"].len(), 31);
    assert!(results.comparison.is_none());

    let json: serde_json::Value =
        serde_json::from_str(&output.contents("baseline__results", "json").unwrap()).unwrap();
    assert_eq!(json["cost_samples"].as_array().unwrap().len(), 6);
    assert!(json["aggregate_statistics"]["costo90"].is_number());

    let csv = output.contents("baseline__cost_samples", "csv").unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("run_index,seed,total_cost,cooling_cost,it_cost,cooling_energy_kwh,peak_room_temp,hours_above_comfort_limit")
    );
    assert_eq!(lines.count(), 6);
}

#[rstest]
fn test_run_project_compares_policies(input_json: Vec<u8>) {
    let output = MemoryOutput::default();
    let results = run_project(
        input_json.as_slice(),
        output.clone(),
        ExternalData::default(),
        &ProjectOptions {
            compare: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        results.payloads.keys().copied().collect::<Vec<_>>(),
        vec![PolicyKind::Baseline, PolicyKind::Optimized]
    );
    assert!(results.comparison.is_some());
    assert!(output.contents("optimized__results", "json").is_some());
    assert!(output.contents("comparison", "json").is_some());
}

#[rstest]
fn test_overrides_replace_request(input_json: Vec<u8>) {
    let results = run_project(
        input_json.as_slice(),
        SinkOutput,
        ExternalData::default(),
        &ProjectOptions {
            overrides: RequestOverrides {
                n_runs: Some(3),
                control_policy: Some(PolicyKind::Optimized),
                equipment_id: Some("premium".to_string()),
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();

    let payload = &results.payloads[&PolicyKind::Optimized];
    assert_eq!(payload.cost_samples.len(), 3);
    assert_eq!(payload.equipment_id, "premium");
    assert_eq!(payload.request.control_policy, PolicyKind::Optimized);
}

#[rstest]
#[case::no_runs(r#"{"request": {"n_runs": 0}}"#)]
#[case::undersized_cooling(r#"{"physical": {"max_cooling_power": 40000}}"#)]
#[case::rising_cop_curve(
    r#"{"equipment_catalog": {"eficiente": {"name": "Eficiente", "cop_nominal": 3.2, "potencia_nominal": 60000, "precio": 1, "vida_util": 10, "mantenimiento_anual": 1, "cop_curve": {"type": "affine", "reference_temp": 35, "cop_at_reference": 3.2, "slope": 0.06, "floor": 1.2}}}}"#
)]
fn test_configuration_errors_stop_before_any_run(#[case] json: &str) {
    assert!(matches!(
        run_project(
            json.as_bytes(),
            SinkOutput,
            ExternalData::default(),
            &ProjectOptions::default()
        ),
        Err(CoolsimError::Configuration(_))
    ));
}

#[rstest]
fn test_malformed_document_is_invalid_request() {
    assert!(matches!(
        run_project(
            "{\"physical\": ".as_bytes(),
            SinkOutput,
            ExternalData::default(),
            &ProjectOptions::default()
        ),
        Err(CoolsimError::InvalidRequest(_))
    ));
}

#[rstest]
fn test_cancelled_project_is_empty_batch(input_json: Vec<u8>) {
    let options = ProjectOptions::default();
    options.cancellation.cancel();
    assert!(matches!(
        run_project(input_json.as_slice(), SinkOutput, ExternalData::default(), &options),
        Err(CoolsimError::EmptyBatch(_))
    ));
}
