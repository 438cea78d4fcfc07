//! Tests for LaunchSpec and Java version selection
//!
//! These tests verify:
//! - The Spigot launch recipe (`java -jar <jar> nogui` from the jar's directory)
//! - Builder-style overrides
//! - Revision → Java version mapping

use std::path::PathBuf;

use consolerelay::process::{required_java_version, LaunchSpec, NO_GUI_ARG};
use consolerelay::RelayError;

// =============================================================================
// LaunchSpec Tests
// =============================================================================

#[test]
fn test_spigot_launch_recipe() {
    let spec = LaunchSpec::spigot("/home/mc/spigot-1.17/spigot-1.17.jar").unwrap();

    assert_eq!(spec.program, "java");
    assert_eq!(spec.args, vec!["-jar", "spigot-1.17.jar", NO_GUI_ARG]);
    assert_eq!(spec.working_dir, Some(PathBuf::from("/home/mc/spigot-1.17")));
}

#[test]
fn test_spigot_bare_file_name_runs_in_current_dir() {
    let spec = LaunchSpec::spigot("server.jar").unwrap();

    assert_eq!(spec.args[1], "server.jar");
    assert_eq!(spec.working_dir, Some(PathBuf::from(".")));
}

#[test]
fn test_spigot_rejects_path_without_file_name() {
    let result = LaunchSpec::spigot("/");

    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[test]
fn test_with_java_overrides_program() {
    let spec = LaunchSpec::spigot("srv/spigot.jar")
        .unwrap()
        .with_java("/usr/lib/jvm/jdk-17/bin/java");

    assert_eq!(spec.program, "/usr/lib/jvm/jdk-17/bin/java");
    assert_eq!(spec.args.len(), 3);
}

#[test]
fn test_display_joins_command_line() {
    let spec = LaunchSpec::new("sh").arg("-c").arg("echo hi");

    assert_eq!(spec.display(), "sh -c echo hi");
    assert!(spec.working_dir.is_none());
}

// =============================================================================
// Java Version Tests
// =============================================================================

#[test]
fn test_java_version_for_modern_revisions() {
    assert_eq!(required_java_version("1.19").unwrap(), 18);
    assert_eq!(required_java_version("1.19.2").unwrap(), 18);
    assert_eq!(required_java_version("1.18.1").unwrap(), 17);
    assert_eq!(required_java_version("1.17").unwrap(), 16);
}

#[test]
fn test_java_version_for_legacy_revisions() {
    for revision in ["1.8", "1.8.8", "1.12.2", "1.16.5"] {
        assert_eq!(required_java_version(revision).unwrap(), 11, "revision {}", revision);
    }
}

#[test]
fn test_java_version_unknown_revisions() {
    for revision in ["1.7.10", "1.20", "2.0", "", "latest", "1"] {
        assert!(
            matches!(required_java_version(revision), Err(RelayError::Config(_))),
            "revision {:?}",
            revision
        );
    }
}
