use std::path::Path;

/// Truncate on a char boundary so the result is at most `max_bytes` long.
pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Lossy-decode captured process output and trim surrounding whitespace.
pub fn trimmed_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Convert a relative path to a `/`-separated string regardless of host.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        let truncated = truncate_string(text, 2);
        assert_eq!(truncated, "h...");
        assert_eq!(truncate_string("short", 32), "short");
    }

    #[test]
    fn slash_path_joins_components() {
        let path = PathBuf::from("a").join("b").join("c.json");
        assert_eq!(slash_path(&path), "a/b/c.json");
    }
}
