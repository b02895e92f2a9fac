use super::*;

// =============================================================================
// resolve_base_url (pure, no env access)
// =============================================================================

#[test]
fn override_wins_over_environment() {
    let url = resolve_base_url(Some("https://books.example.test/api"), Some(Environment::Development));
    assert_eq!(url, "https://books.example.test/api");
}

#[test]
fn environment_default_when_no_override() {
    assert_eq!(resolve_base_url(None, Some(Environment::Development)), DEVELOPMENT_BASE_URL);
    assert_eq!(resolve_base_url(None, Some(Environment::Production)), PRODUCTION_BASE_URL);
}

#[test]
fn fallback_when_nothing_set() {
    assert_eq!(resolve_base_url(None, None), FALLBACK_BASE_URL);
}

#[test]
fn blank_override_is_ignored() {
    assert_eq!(resolve_base_url(Some("   "), Some(Environment::Development)), DEVELOPMENT_BASE_URL);
}

#[test]
fn trailing_slashes_stripped() {
    assert_eq!(resolve_base_url(Some("http://127.0.0.1:9000/api//"), None), "http://127.0.0.1:9000/api");
}

// =============================================================================
// Environment parsing
// =============================================================================

#[test]
fn environment_parse_variants() {
    assert_eq!(Environment::parse("development"), Some(Environment::Development));
    assert_eq!(Environment::parse("  DEV "), Some(Environment::Development));
    assert_eq!(Environment::parse("Production"), Some(Environment::Production));
    assert_eq!(Environment::parse("prod"), Some(Environment::Production));
    assert_eq!(Environment::parse("staging"), None);
}

// =============================================================================
// ClientConfig::resolve
// =============================================================================

#[test]
fn resolve_unknown_environment_uses_fallback() {
    let cfg = ClientConfig::resolve(None, Some("staging")).unwrap();
    assert_eq!(cfg.environment, None);
    assert_eq!(cfg.base_url, FALLBACK_BASE_URL);
}

#[test]
fn resolve_development_flag() {
    let cfg = ClientConfig::resolve(None, Some("development")).unwrap();
    assert_eq!(cfg.environment, Some(Environment::Development));
    assert_eq!(cfg.base_url, DEVELOPMENT_BASE_URL);
}

#[test]
fn resolve_rejects_garbage_override() {
    let err = ClientConfig::resolve(Some("not a url"), None).unwrap_err();
    assert!(matches!(err, ApiError::InvalidBaseUrl(_)));
}

#[test]
fn resolve_rejects_non_http_scheme() {
    let err = ClientConfig::resolve(Some("ftp://books.example.test"), None).unwrap_err();
    assert!(err.to_string().contains("unsupported scheme"));
}

// =============================================================================
// Paths
// =============================================================================

#[test]
fn credential_path_is_inside_home() {
    let path = credential_path().unwrap();
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("token"));
    assert_eq!(path.parent().unwrap(), libris_home().unwrap());
}
