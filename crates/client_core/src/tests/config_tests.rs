use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_dashboard_constants() {
    let settings = DashboardSettings::default();

    assert_eq!(settings.snapshot_retry(), RetryPolicy::default());
    assert_eq!(settings.reconnect_policy(), ReconnectPolicy::default());
    assert_eq!(settings.banner_ttls(), BannerTtls::default());
    assert_eq!(settings.stream_page_size().expect("page size").get(), 2);
    settings.validate().expect("defaults are valid");
}

#[test]
fn partial_toml_keeps_defaults_for_missing_keys() {
    let settings: DashboardSettings = toml::from_str(
        r#"
        api_base_url = "https://monitor.example/api"
        reconnect_delays_ms = [0, 500]
        reconnect_forever = true
        "#,
    )
    .expect("parse");

    assert_eq!(settings.api_base_url, "https://monitor.example/api");
    assert_eq!(settings.hub_url, DashboardSettings::default().hub_url);
    assert_eq!(settings.load_retry_attempts, 3);

    let policy = settings.reconnect_policy();
    assert_eq!(
        policy.delays,
        vec![Duration::ZERO, Duration::from_millis(500)]
    );
    assert!(policy.retry_forever);
}

#[test]
fn environment_overrides_take_precedence() {
    let mut settings = DashboardSettings::default();
    settings
        .apply_overrides(lookup(&[
            ("MONITOR_API_URL", "http://10.0.0.5/api/"),
            ("MONITOR_HUB_URL", "wss://10.0.0.5/monitoringhub"),
            ("MONITOR_STREAM_INFO_URL", "http://10.0.0.5:8080/streams"),
            ("MONITOR_LOAD_RETRY_ATTEMPTS", " 5 "),
            ("MONITOR_LOAD_RETRY_DELAY_MS", "250"),
            ("MONITOR_RECONNECT_DELAYS_MS", "0, 100,1000"),
        ]))
        .expect("overrides");

    assert_eq!(settings.api_base_url, "http://10.0.0.5/api/");
    assert_eq!(settings.hub_url, "wss://10.0.0.5/monitoringhub");
    assert_eq!(
        settings.stream_info_url.as_deref(),
        Some("http://10.0.0.5:8080/streams")
    );
    assert_eq!(
        settings.snapshot_retry(),
        RetryPolicy {
            attempts: 5,
            delay: Duration::from_millis(250),
        }
    );
    assert_eq!(settings.reconnect_delays_ms, vec![0, 100, 1000]);
    settings.validate().expect("valid");
}

#[test]
fn malformed_numeric_override_is_rejected() {
    let mut settings = DashboardSettings::default();
    let err = settings
        .apply_overrides(lookup(&[("MONITOR_LOAD_RETRY_ATTEMPTS", "three")]))
        .expect_err("must fail");

    assert!(err.to_string().contains("MONITOR_LOAD_RETRY_ATTEMPTS"));
}

#[test]
fn validation_rejects_unusable_settings() {
    let zero_attempts = DashboardSettings {
        load_retry_attempts: 0,
        ..DashboardSettings::default()
    };
    assert!(zero_attempts.validate().is_err());

    let zero_page = DashboardSettings {
        stream_page_size: 0,
        ..DashboardSettings::default()
    };
    assert!(zero_page.validate().is_err());

    let ftp_hub = DashboardSettings {
        hub_url: "ftp://127.0.0.1/monitoringhub".into(),
        ..DashboardSettings::default()
    };
    let err = ftp_hub.validate().expect_err("ftp is not a hub scheme");
    assert!(err.to_string().contains("hub_url"));

    let ws_api = DashboardSettings {
        api_base_url: "ws://127.0.0.1/api".into(),
        ..DashboardSettings::default()
    };
    assert!(ws_api.validate().is_err());
}

#[test]
fn settings_file_is_read_from_explicit_path() {
    let path = std::env::temp_dir().join(format!(
        "dashboard-settings-{}.toml",
        std::process::id()
    ));
    fs::write(&path, "stream_page_size = 4\nhot_threshold_celsius = 30.5\n").expect("write");

    let settings = read_settings_file(&path).expect("read");
    let _ = fs::remove_file(&path);

    assert_eq!(settings.stream_page_size, 4);
    assert_eq!(settings.hot_threshold_celsius, 30.5);
}

#[test]
fn missing_settings_file_reports_its_path() {
    let err = read_settings_file(Path::new("/nonexistent/dashboard.toml")).expect_err("missing");
    assert!(err.to_string().contains("/nonexistent/dashboard.toml"));
}
