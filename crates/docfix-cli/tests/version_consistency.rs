//! Ensures every workspace crate inherits the workspace version and that
//! internal dependency pins agree with it.

use std::path::{Path, PathBuf};

const CRATES: [&str; 3] = [
    "crates/docfix-channel",
    "crates/docfix-core",
    "crates/docfix-cli",
];

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    let raw = std::fs::read_to_string(path).unwrap();
    raw.parse().unwrap()
}

fn workspace_version() -> String {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    doc["workspace"]["package"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn all_crates_use_workspace_version() {
    for krate in CRATES {
        let doc = read_toml(&workspace_root().join(krate).join("Cargo.toml"));
        let inherits = doc
            .get("package")
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_table())
            .and_then(|t| t.get("workspace"))
            .and_then(|w| w.as_bool());
        assert_eq!(
            inherits,
            Some(true),
            "{krate} should use version.workspace = true"
        );
    }
}

#[test]
fn internal_dependency_pins_match_workspace_version() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let deps = doc["workspace"]["dependencies"].as_table().unwrap();
    let expected = workspace_version();

    for name in ["docfix-channel", "docfix-core"] {
        let pin = deps[name]["version"].as_str().unwrap();
        assert_eq!(pin, expected, "{name} pinned to {pin}, workspace is {expected}");
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    assert_eq!(workspace_version(), env!("CARGO_PKG_VERSION"));
}
