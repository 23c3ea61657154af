//! Integration tests for metrics server functionality.

use proxysync_core::config::MetricsConfig;
use proxysync_daemon::metrics_server;
use serial_test::serial;

#[test]
fn test_listen_address_parses() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 9469,
    };
    let addr = metrics_server::listen_address(&config).expect("address should parse");
    assert_eq!(addr.port(), 9469);
    assert!(addr.ip().is_loopback());
}

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_owned(),
        port: 9469,
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should fail with invalid address"
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_succeeds_with_valid_config() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 19469,
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        result.err()
    );
}
