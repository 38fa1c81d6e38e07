use super::*;

const FULL: &str = r#"
    [courier]
    name = "relay-1"
    log_level = "debug"

    [telegram]
    bot_token = "123:abc"
    phone = "+15550100"

    [[routes]]
    selector = "@News"
    webhook_url = "https://discord.com/api/webhooks/1/a"

    [[routes]]
    selector = "-100123"
    webhook_url = "https://discord.com/api/webhooks/2/b"

    [poll]
    channels = ["@News", "market"]
    interval_secs = 5

    [dedup]
    capacity = 200
"#;

fn valid() -> Config {
    parse(FULL).unwrap()
}

#[test]
fn test_parse_full_config() {
    let cfg = valid();
    assert_eq!(cfg.courier.name, "relay-1");
    assert_eq!(cfg.telegram.bot_token, "123:abc");
    assert_eq!(cfg.telegram.phone.as_deref(), Some("+15550100"));
    assert_eq!(cfg.routes.len(), 2);
    assert_eq!(cfg.routes[0].selector, "@News");
    assert_eq!(cfg.routes[1].selector, "-100123");
    assert_eq!(cfg.poll.channels, vec!["@News", "market"]);
    assert_eq!(cfg.poll.interval_secs, 5);
    assert_eq!(cfg.dedup.capacity, 200);
}

#[test]
fn test_defaults_when_sections_missing() {
    let cfg = parse(
        r#"
        [telegram]
        bot_token = "t"
    "#,
    )
    .unwrap();
    assert_eq!(cfg.courier.name, "courier");
    assert_eq!(cfg.courier.log_level, "info");
    assert!(cfg.courier.log_dir.is_none());
    assert_eq!(cfg.telegram.api_base, "https://api.telegram.org");
    assert!(cfg.routes.is_empty());
    assert!(cfg.poll.channels.is_empty());
    assert_eq!(cfg.poll.interval_secs, 2);
    assert_eq!(cfg.dedup.capacity, 1000);
    assert_eq!(cfg.forward.max_document_bytes, 8 * 1024 * 1024);
    assert_eq!(cfg.forward.max_request_bytes, 25 * 1024 * 1024);
    assert_eq!(cfg.forward.max_description_chars, 4000);
}

#[test]
fn test_validate_accepts_full_config() {
    assert!(valid().validate().is_ok());
}

#[test]
fn test_validate_rejects_empty_token() {
    let mut cfg = valid();
    cfg.telegram.bot_token = "  ".into();
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("bot_token"), "got: {err}");
}

#[test]
fn test_validate_rejects_no_routes() {
    let mut cfg = valid();
    cfg.routes.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_webhook_url() {
    let mut cfg = valid();
    cfg.routes[1].webhook_url = "discord.com/api/webhooks/2/b".into();
    let err = cfg.validate().unwrap_err().to_string();
    assert!(err.contains("routes[1]"), "got: {err}");
}

#[test]
fn test_validate_rejects_empty_selector() {
    let mut cfg = valid();
    cfg.routes[0].selector = String::new();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_capacity_and_interval() {
    let mut cfg = valid();
    cfg.dedup.capacity = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = valid();
    cfg.poll.interval_secs = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_description_limit_below_marker() {
    let mut cfg = valid();
    cfg.forward.max_description_chars = TRUNCATION_MARKER.chars().count() - 1;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("max_description_chars"));

    cfg.forward.max_description_chars = TRUNCATION_MARKER.chars().count();
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_parse_error_is_config_error() {
    let err = parse("[[routes]]\nselector = 5").unwrap_err();
    assert!(matches!(err, CourierError::Config(_)));
}

#[test]
fn test_load_missing_file() {
    let err = load("/nonexistent/__courier_config__.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_load_from_file() {
    let tmp = std::env::temp_dir().join("__courier_test_load_config__.toml");
    std::fs::write(&tmp, FULL).unwrap();
    let cfg = load(tmp.to_str().unwrap()).unwrap();
    assert_eq!(cfg.routes.len(), 2);
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_leaves_plain_paths() {
    assert_eq!(shellexpand("/var/log/courier"), "/var/log/courier");
    assert_eq!(shellexpand("logs"), "logs");
}
