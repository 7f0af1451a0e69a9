#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Manifest policy tests for the trivia room client.
//!
//! These tests verify that Cargo.toml keeps the agreed-upon lint denies,
//! feature layout, and dependency boundaries. If one fails, the manifest has
//! drifted from project policy.
//!
//! All checks are synchronous filesystem reads — no network access or async
//! runtime needed.

use std::path::PathBuf;

/// Returns the project root directory (where Cargo.toml lives).
fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn manifest() -> toml::Value {
    let path = project_root().join("Cargo.toml");
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    raw.parse::<toml::Value>().expect("Cargo.toml parses as TOML")
}

#[test]
fn package_identity() {
    let doc = manifest();
    let package = doc["package"].as_table().expect("[package] table");
    assert_eq!(package["name"].as_str(), Some("trivia-room-client"));
    assert_eq!(package["edition"].as_str(), Some("2021"));
    assert!(
        package.contains_key("rust-version"),
        "rust-version must be pinned (async closures need 1.85)"
    );
}

#[test]
fn panic_paths_are_denied_by_lint_policy() {
    let doc = manifest();
    let clippy = doc["lints"]["clippy"]
        .as_table()
        .expect("[lints.clippy] table");
    for lint in [
        "unwrap_used",
        "expect_used",
        "panic",
        "todo",
        "unimplemented",
        "indexing_slicing",
    ] {
        assert_eq!(
            clippy.get(lint).and_then(|v| v.as_str()),
            Some("deny"),
            "clippy::{lint} must be denied"
        );
    }
}

#[test]
fn http_backend_is_a_default_feature() {
    let doc = manifest();
    let features = doc["features"].as_table().expect("[features] table");
    let default = features["default"].as_array().expect("default feature list");
    assert!(
        default.iter().any(|v| v.as_str() == Some("api-http")),
        "api-http must be on by default"
    );
    let api_http = features["api-http"].as_array().expect("api-http feature");
    assert!(
        api_http.iter().any(|v| v.as_str() == Some("dep:reqwest")),
        "api-http must gate the reqwest dependency"
    );
}

#[test]
fn reqwest_stays_optional_and_rustls_only() {
    let doc = manifest();
    let reqwest = doc["dependencies"]["reqwest"]
        .as_table()
        .expect("reqwest dependency table");
    assert_eq!(reqwest["optional"].as_bool(), Some(true));
    assert_eq!(
        reqwest["default-features"].as_bool(),
        Some(false),
        "reqwest default features pull in native TLS"
    );
    let features = reqwest["features"].as_array().expect("reqwest features");
    assert!(features.iter().any(|v| v.as_str() == Some("rustls-tls")));
}

#[test]
fn core_stack_is_present() {
    let doc = manifest();
    let deps = doc["dependencies"].as_table().expect("[dependencies]");
    for name in [
        "tokio",
        "async-trait",
        "serde",
        "serde_json",
        "uuid",
        "thiserror",
        "tracing",
    ] {
        assert!(deps.contains_key(name), "missing core dependency: {name}");
    }
}

#[test]
fn tokio_features_stay_minimal_in_the_library() {
    let doc = manifest();
    let tokio = doc["dependencies"]["tokio"]
        .as_table()
        .expect("tokio dependency table");
    let features: Vec<&str> = tokio["features"]
        .as_array()
        .expect("tokio features")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    for needed in ["rt", "time", "sync", "macros"] {
        assert!(features.contains(&needed), "tokio needs {needed}");
    }
    assert!(
        !features.contains(&"full"),
        "the library must not depend on tokio/full; that belongs in dev-dependencies"
    );
}

#[test]
fn demos_are_wired_as_examples() {
    let doc = manifest();
    let examples = doc["example"].as_array().expect("[[example]] entries");
    let names: Vec<&str> = examples
        .iter()
        .filter_map(|e| e["name"].as_str())
        .collect();
    assert!(names.contains(&"solo_round"));
    assert!(names.contains(&"lobby"));
    for example in examples {
        let path = example["path"].as_str().expect("example path");
        assert!(
            path.starts_with("demos/"),
            "examples live under demos/: {path}"
        );
        assert!(
            project_root().join(path).is_file(),
            "example source missing: {path}"
        );
    }
}
