//! Source path to canonical index filename.
//!
//! Every artifact is named after the directory it documents, with path
//! separators flattened to hyphens, so the master index stays one level deep:
//!
//! ```text
//! docmap.json                  -> _root.json
//! src/docmap.json              -> src-root.json
//! src/app/http/docmap.json     -> src-app-http.json
//! ```
//!
//! Names that already look canonical pass through unchanged, which makes the
//! transform idempotent. The flattening is not collision-free (`a-b/x` and
//! `a/b-x` meet); in practice source trees rarely produce such pairs.
use crate::collect::{is_artifact_name, ArtifactVariant};
use crate::util::slash_path;
use std::path::{Path, PathBuf};

/// Canonical name for an artifact in the project root.
pub const ROOT_CANONICAL_NAME: &str = "_root.json";
/// Extension of every canonical name.
pub const CANONICAL_EXTENSION: &str = ".json";
/// Appended to conventional directory names before the extension.
pub const CONVENTIONAL_SUFFIX: &str = "-root";
/// Top-level names common enough that a bare `<name>.json` would read like
/// a project-wide file rather than a directory's.
pub const CONVENTIONAL_DIR_NAMES: [&str; 11] = [
    "src", "source", "lib", "test", "tests", "doc", "docs", "tools", "types", "scripts", "bin",
];

/// Map a root-relative source path to its canonical index filename.
pub fn canonical_name(source_rel_path: &str) -> String {
    let normalized = normalize(source_rel_path);
    let (dir, file_name) = match normalized.rsplit_once('/') {
        Some((dir, file_name)) => (dir, file_name),
        None => ("", normalized.as_str()),
    };
    if !is_artifact_name(file_name) {
        return passthrough_name(&normalized);
    }
    let token = flatten(dir);
    if token.is_empty() {
        return ROOT_CANONICAL_NAME.to_string();
    }
    let plain = format!("{token}{CANONICAL_EXTENSION}");
    if needs_suffix(&token, &plain) {
        format!("{token}{CONVENTIONAL_SUFFIX}{CANONICAL_EXTENSION}")
    } else {
        plain
    }
}

/// [`canonical_name`] for a filesystem path.
pub fn canonical_name_for_path(source_rel_path: &Path) -> String {
    canonical_name(&slash_path(source_rel_path))
}

// A token whose plain name would itself parse as an artifact file also gets
// the suffix, otherwise re-applying the transform would map it to the root.
fn needs_suffix(token: &str, plain: &str) -> bool {
    CONVENTIONAL_DIR_NAMES.contains(&token) || is_artifact_name(plain)
}

fn normalize(raw: &str) -> String {
    let mut path = raw.replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    path.trim_start_matches('/').to_string()
}

fn flatten(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("-")
}

fn passthrough_name(normalized: &str) -> String {
    let flat = flatten(normalized);
    if flat.ends_with(CANONICAL_EXTENSION) {
        flat
    } else {
        format!("{flat}{CANONICAL_EXTENSION}")
    }
}

/// A discovered artifact paired with its destination name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub source_rel_path: PathBuf,
    pub canonical_name: String,
    /// Reported in merge logs; both variants share one canonical name.
    pub variant: Option<ArtifactVariant>,
}

impl ArtifactRef {
    pub fn new(source_rel_path: &Path) -> Self {
        let variant = source_rel_path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(ArtifactVariant::from_file_name);
        Self {
            source_rel_path: source_rel_path.to_path_buf(),
            canonical_name: canonical_name_for_path(source_rel_path),
            variant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_artifacts_use_fixed_name() {
        assert_eq!(canonical_name("docmap.json"), ROOT_CANONICAL_NAME);
        assert_eq!(canonical_name("./docmap.json"), ROOT_CANONICAL_NAME);
        assert_eq!(canonical_name("/docmap.enhanced.json"), ROOT_CANONICAL_NAME);
    }

    #[test]
    fn nested_directories_flatten_with_hyphens() {
        assert_eq!(canonical_name("api/v2/handlers/docmap.json"), "api-v2-handlers.json");
        assert_eq!(canonical_name("/web/docmap.json"), "web.json");
        assert_eq!(canonical_name("web\\ui\\docmap.json"), "web-ui.json");
    }

    #[test]
    fn conventional_names_get_suffix() {
        assert_eq!(canonical_name("source/docmap.json"), "source-root.json");
        assert_eq!(canonical_name("src/docmap.json"), "src-root.json");
        assert_eq!(canonical_name("tests/docmap.json"), "tests-root.json");
        assert_eq!(canonical_name("src/core/docmap.json"), "src-core.json");
    }

    #[test]
    fn directory_named_like_the_artifact_is_suffixed() {
        assert_eq!(canonical_name("docmap/docmap.json"), "docmap-root.json");
        assert_eq!(
            canonical_name(&canonical_name("docmap/docmap.json")),
            "docmap-root.json"
        );
    }

    #[test]
    fn both_variants_share_a_name() {
        assert_eq!(
            canonical_name("pkg/util/docmap.json"),
            canonical_name("pkg/util/docmap.enhanced.json")
        );
    }

    #[test]
    fn transform_is_idempotent() {
        let inputs = [
            "docmap.json",
            "docmap.enhanced.json",
            "src/docmap.json",
            "types/docmap.enhanced.json",
            "a/b/c/d/docmap.json",
            "./web/app/docmap.json",
            "docmap/docmap.json",
            "docmap.enhanced/docmap.json",
            "_root.json",
            "src-root.json",
            "notes/readme.md",
        ];
        for input in inputs {
            let once = canonical_name(input);
            let twice = canonical_name(&once);
            assert_eq!(once, twice, "not idempotent for {input}");
            assert!(!once.contains('/'), "{once} still nested");
        }
    }

    #[test]
    fn hyphen_count_tracks_depth() {
        for depth in 1..=6 {
            let segments: Vec<String> = (0..depth).map(|i| format!("seg{i}")).collect();
            let input = format!("{}/docmap.json", segments.join("/"));
            let name = canonical_name(&input);
            assert_eq!(
                name.matches('-').count(),
                depth - 1,
                "{input} -> {name}"
            );
        }
    }

    #[test]
    fn artifact_ref_records_variant() {
        let reference = ArtifactRef::new(Path::new("lib/docmap.enhanced.json"));
        assert_eq!(reference.canonical_name, "lib-root.json");
        assert_eq!(reference.variant, Some(ArtifactVariant::Enhanced));
    }
}
