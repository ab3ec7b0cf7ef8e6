//! Arming flow against a scripted panel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use secvest_bridge::alarm::{AlarmController, ArmError, ArmPolicy, Coordinator, CoordinatorOptions};
use secvest_bridge::config::{BridgeConfig, Locale};
use secvest_bridge::panel::client::{MODE_PATHS, PARTITION_PATHS, ZONES_PATHS};
use secvest_bridge::panel::mock::MockTransport;
use secvest_bridge::panel::{PanelError, PanelMethod};
use secvest_bridge::resilience::backoff::BackoffPolicy;
use secvest_bridge::resilience::{BreakerSettings, CircuitBreaker, RetryPolicy};
use secvest_bridge::zones::ZoneCache;
use secvest_bridge::SecvestClient;

const CLOSED_ZONES: &str = r#"[{"name":"Haustür","state":"closed"},{"name":"Terrasse","state":"closed"}]"#;
const TERRACE_OPEN: &str = r#"[{"name":"Haustür","state":"closed"},{"name":"Terrasse","state":"open"}]"#;

fn setup(mock: &MockTransport, tolerated: &[&str]) -> (Arc<Coordinator>, AlarmController) {
    let breaker = Arc::new(CircuitBreaker::new(
        "test",
        BreakerSettings {
            failure_threshold: 5,
            cooldown: Duration::from_secs(300),
            failure_window: Duration::from_secs(600),
        },
    ));
    let client = SecvestClient::new(
        Arc::new(mock.clone()),
        "1234",
        RetryPolicy {
            max_attempts: 1,
            backoff: BackoffPolicy::none(),
        },
        breaker,
    );
    let mut options = CoordinatorOptions::from(&BridgeConfig::default());
    options.locale = Locale::De;
    let coordinator = Arc::new(Coordinator::new(Arc::new(client), Arc::new(ZoneCache::new()), options));
    let policy = ArmPolicy {
        home_tolerated_zones: tolerated.iter().map(|z| z.to_string()).collect::<BTreeSet<_>>(),
    };
    let controller = AlarmController::new(coordinator.clone(), policy);
    (coordinator, controller)
}

fn script(mock: &MockTransport, zones: &str) {
    mock.respond(PanelMethod::Get, MODE_PATHS[0], 200, r#"{"state":"unset"}"#);
    mock.respond(PanelMethod::Get, ZONES_PATHS[0], 200, zones);
    mock.respond(PanelMethod::Put, PARTITION_PATHS[0], 200, "");
}

#[tokio::test]
async fn test_arm_refreshes_zones_once_before_command() {
    let mock = MockTransport::new();
    script(&mock, CLOSED_ZONES);
    let (coordinator, controller) = setup(&mock, &[]);

    // Populate the cache first; arming must not trust it.
    coordinator.refresh().await.unwrap();
    let before = mock.count(PanelMethod::Get, ZONES_PATHS[0]);

    controller.arm_away().await.unwrap();

    assert_eq!(mock.count(PanelMethod::Get, ZONES_PATHS[0]), before + 1);
    let calls = mock.calls();
    let put = calls
        .iter()
        .rposition(|c| c.method == PanelMethod::Put)
        .expect("no PUT issued");
    let last_zones = calls
        .iter()
        .rposition(|c| c.method == PanelMethod::Get && c.path == ZONES_PATHS[0])
        .expect("no zones GET");
    assert!(last_zones < put);

    let body = calls[put].body.as_ref().unwrap();
    assert_eq!(body["state"], "set");
    assert_eq!(body["code"], "1234");
}

#[tokio::test]
async fn test_failed_zone_refresh_blocks_arming() {
    let mock = MockTransport::new();
    mock.respond(PanelMethod::Get, MODE_PATHS[0], 200, r#"{"state":"unset"}"#);
    mock.respond(PanelMethod::Get, ZONES_PATHS[0], 200, CLOSED_ZONES);
    mock.respond(PanelMethod::Put, PARTITION_PATHS[0], 200, "");
    let (coordinator, controller) = setup(&mock, &[]);
    coordinator.refresh().await.unwrap();

    mock.clear_replies();
    mock.respond(PanelMethod::Get, ZONES_PATHS[0], 503, "");
    mock.respond(PanelMethod::Put, PARTITION_PATHS[0], 200, "");

    let err = controller.arm_home().await.unwrap_err();

    assert!(matches!(err, ArmError::ZoneRefresh(_)), "{err:?}");
    assert_eq!(mock.count(PanelMethod::Put, PARTITION_PATHS[0]), 0);
    assert!(!coordinator.cache().is_fresh());
    let snapshot = coordinator.current().unwrap();
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_open_zone_blocks_away_with_spoken_message() {
    let mock = MockTransport::new();
    script(&mock, TERRACE_OPEN);
    let (coordinator, controller) = setup(&mock, &["Terrasse"]);

    let err = controller.arm_away().await.unwrap_err();

    match &err {
        ArmError::OpenZones { zones, message } => {
            assert_eq!(zones, &vec!["Terrasse".to_string()]);
            assert_eq!(
                message,
                "Ich konnte die Alarmanlage nicht aktivieren, bitte schließe: Terrasse."
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.count(PanelMethod::Put, PARTITION_PATHS[0]), 0);
    assert_eq!(
        coordinator.current().unwrap().last_error.as_deref(),
        Some("Ich konnte die Alarmanlage nicht aktivieren, bitte schließe: Terrasse.")
    );
}

#[tokio::test]
async fn test_home_tolerates_configured_zones() {
    let mock = MockTransport::new();
    script(&mock, TERRACE_OPEN);
    let (_coordinator, controller) = setup(&mock, &["Terrasse"]);

    controller.arm_home().await.unwrap();

    let calls = mock.calls();
    let put = calls.iter().find(|c| c.method == PanelMethod::Put).unwrap();
    assert_eq!(put.body.as_ref().unwrap()["state"], "partset");
}

#[tokio::test]
async fn test_home_blocks_untolerated_zones() {
    let mock = MockTransport::new();
    script(&mock, TERRACE_OPEN);
    let (_coordinator, controller) = setup(&mock, &[]);

    let err = controller.arm_home().await.unwrap_err();

    assert!(matches!(err, ArmError::OpenZones { .. }), "{err:?}");
    assert_eq!(mock.count(PanelMethod::Put, PARTITION_PATHS[0]), 0);
}

#[tokio::test]
async fn test_disarm_skips_zone_refresh() {
    let mock = MockTransport::new();
    script(&mock, TERRACE_OPEN);
    let (_coordinator, controller) = setup(&mock, &[]);

    controller.disarm().await.unwrap();

    assert_eq!(mock.count(PanelMethod::Get, ZONES_PATHS[0]), 0);
    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body.as_ref().unwrap()["state"], "unset");
}

#[tokio::test]
async fn test_set_mode_rejects_unknown_modes() {
    let mock = MockTransport::new();
    script(&mock, CLOSED_ZONES);
    let (_coordinator, controller) = setup(&mock, &[]);

    let err = controller.set_mode("armed").await.unwrap_err();

    assert!(matches!(err, ArmError::InvalidMode { ref mode } if mode == "armed"));
    assert_eq!(mock.total_calls(), 0);
}

#[tokio::test]
async fn test_set_mode_partset_arms_home() {
    let mock = MockTransport::new();
    script(&mock, CLOSED_ZONES);
    let (_coordinator, controller) = setup(&mock, &[]);

    controller.set_mode("partset").await.unwrap();

    assert_eq!(mock.count(PanelMethod::Get, ZONES_PATHS[0]), 1);
    let calls = mock.calls();
    let put = calls.iter().find(|c| c.method == PanelMethod::Put).unwrap();
    assert_eq!(put.body.as_ref().unwrap()["state"], "partset");
}

#[tokio::test]
async fn test_command_conflict_is_reported() {
    let mock = MockTransport::new();
    mock.respond(PanelMethod::Get, ZONES_PATHS[0], 200, CLOSED_ZONES);
    mock.respond(PanelMethod::Put, PARTITION_PATHS[0], 409, r#"{"error":"zone open"}"#);
    let (coordinator, controller) = setup(&mock, &[]);

    let err = controller.arm_away().await.unwrap_err();

    match err {
        ArmError::Command(PanelError::Conflict { body }) => assert!(body.contains("zone open")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.count(PanelMethod::Put, PARTITION_PATHS[0]), 1);
    assert!(coordinator.current().unwrap().last_error.is_some());
}
