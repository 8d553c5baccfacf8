// Tests for service configuration

use clap::{Arg, Command, value_parser};
use pagescope_core::{ConfigError, LogFormat, ServiceConfig};
use std::time::Duration;

fn command() -> Command {
    Command::new("test")
        .arg(Arg::new("port").long("port").value_parser(value_parser!(u16)))
        .arg(
            Arg::new("debug-port")
                .long("debug-port")
                .value_parser(value_parser!(u16)),
        )
        .arg(Arg::new("log-level").long("log-level"))
        .arg(Arg::new("log-format").long("log-format"))
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("request-timeout")
                .long("request-timeout")
                .value_parser(value_parser!(u64)),
        )
}

fn parse(args: &[&str]) -> Result<ServiceConfig, ConfigError> {
    let mut argv = vec!["test"];
    argv.extend_from_slice(args);
    let matches = command().get_matches_from(argv);
    ServiceConfig::from_matches(&matches)
}

#[test]
fn test_defaults() {
    let config = parse(&[]).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.debug_port, 6060);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(config.concurrency >= 1);
    assert_eq!(config.request_timeout, Duration::from_secs(60));
}

#[test]
fn test_overrides() {
    let config = parse(&[
        "--port",
        "9000",
        "--debug-port",
        "9001",
        "--log-level",
        "debug",
        "--log-format",
        "TEXT",
        "--concurrency",
        "3",
        "--request-timeout",
        "15",
    ])
    .unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.debug_port, 9001);
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_format, LogFormat::Text);
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.request_timeout, Duration::from_secs(15));
}

#[test]
fn test_missing_arguments_fall_back_to_defaults() {
    let matches = Command::new("bare").get_matches_from(["bare"]);
    let config = ServiceConfig::from_matches(&matches).unwrap();
    assert_eq!(config.port, 8080);
}

#[test]
fn test_rejects_zero_port() {
    assert_eq!(parse(&["--port", "0"]), Err(ConfigError::ZeroPort));
}

#[test]
fn test_rejects_port_clash() {
    assert_eq!(
        parse(&["--port", "7000", "--debug-port", "7000"]),
        Err(ConfigError::PortClash(7000))
    );
}

#[test]
fn test_rejects_zero_concurrency() {
    assert_eq!(
        parse(&["--concurrency", "0"]),
        Err(ConfigError::ZeroConcurrency)
    );
}

#[test]
fn test_rejects_unknown_log_level() {
    assert_eq!(
        parse(&["--log-level", "verbose"]),
        Err(ConfigError::UnknownLogLevel("verbose".to_string()))
    );
}

#[test]
fn test_rejects_unknown_log_format() {
    assert!(matches!(
        parse(&["--log-format", "xml"]),
        Err(ConfigError::UnknownLogFormat(_))
    ));
}

#[test]
fn test_analyzer_config_doubles_concurrency() {
    let config = ServiceConfig {
        concurrency: 4,
        ..ServiceConfig::default()
    };
    let analyzer = config.analyzer_config();

    assert_eq!(analyzer.workers, 8);
    assert_eq!(analyzer.analysis_timeout, Duration::from_secs(30));
    assert_eq!(analyzer.link_buffer, 100);
}
