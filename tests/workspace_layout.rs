//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration and validation tests for the LoadSynth workspace."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn files_with_extension(dir: &str, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(workspace_root().join(dir))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(extension))
        .collect()
}

#[test]
fn sources_carry_frontmatter() {
    let mut sources = files_with_extension("crates", "rs");
    sources.extend(files_with_extension("bin", "rs"));
    assert!(!sources.is_empty());
    for path in sources {
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("failed to read {}: {}", path.display(), err));
        assert!(
            content.starts_with("//! ---"),
            "{} must include frontmatter header",
            path.display()
        );
        assert!(
            content.contains("ems_section:"),
            "{} frontmatter is missing ems_section",
            path.display()
        );
    }
}

#[test]
fn manifests_carry_frontmatter() {
    let mut manifests = files_with_extension("crates", "toml");
    manifests.extend(files_with_extension("bin", "toml"));
    for path in manifests {
        let content = fs::read_to_string(&path).unwrap();
        assert!(
            content.starts_with("# ---"),
            "{} must include frontmatter header",
            path.display()
        );
    }
}
