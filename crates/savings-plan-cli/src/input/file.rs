use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read an input file and deserialise it into a typed struct. Files ending
/// in `.yaml` or `.yml` are parsed as YAML, everything else as JSON.
pub fn read_input<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    debug!(path = %canonical.display(), yaml = is_yaml(&canonical), "reading input file");
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let parsed: Result<T, String> = if is_yaml(&canonical) {
        serde_yaml::from_str(&contents).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    };
    let value = parsed.map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_detected_by_extension() {
        assert!(is_yaml(Path::new("plan.yaml")));
        assert!(is_yaml(Path::new("dir/plan.yml")));
        assert!(!is_yaml(Path::new("plan.json")));
        assert!(!is_yaml(Path::new("plan")));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_input::<serde_json::Value>("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
