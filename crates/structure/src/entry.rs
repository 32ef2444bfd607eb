//! Path List Parser: raw text or JSON into [`StructureEntry`] values.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::{
    archive::ArchiveFormat,
    error::{Error, Result},
};

/// One path to create, with optional text content.
///
/// A path ending in `/` is a directory and its content is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

impl StructureEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Entry with empty content (plain path lists and presets).
    pub fn path(path: impl Into<String>) -> Self {
        Self::new(path, String::new())
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// How raw input should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// One path per line.
    Lines,
    /// A JSON array of `{path, content}` objects, or `{"structure": [...]}`.
    Json,
}

impl InputKind {
    /// Pick the input kind for an uploaded document from its file name.
    #[must_use]
    pub fn from_file_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if name.to_ascii_lowercase().ends_with(".json") => Self::Json,
            _ => Self::Lines,
        }
    }
}

/// Parsed structure plus the archive format requested by the payload, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSpec {
    pub entries: Vec<StructureEntry>,
    pub format: Option<ArchiveFormat>,
}

/// Parse `raw` according to `kind`, discarding any format hint.
pub fn parse(raw: &str, kind: InputKind) -> Result<Vec<StructureEntry>> {
    match kind {
        InputKind::Lines => parse_lines(raw),
        InputKind::Json => parse_json(raw).map(|spec| spec.entries),
    }
}

/// Parse a newline-separated path list. Blank lines are skipped.
pub fn parse_lines(raw: &str) -> Result<Vec<StructureEntry>> {
    let entries: Vec<StructureEntry> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(StructureEntry::path)
        .collect();
    non_empty(entries)
}

/// Parse a JSON structure description.
pub fn parse_json(raw: &str) -> Result<StructureSpec> {
    let value: Value = serde_json::from_str(raw.trim())?;

    let (items, format) = match value {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let format = match map.get("format") {
                None | Some(Value::Null) => None,
                // Unrecognized names fall back to zip, like command arguments.
                Some(Value::String(s)) => Some(ArchiveFormat::from_arg(Some(s.as_str()))),
                Some(_) => return Err(Error::parse("'format' must be a string")),
            };
            match map.remove("structure") {
                Some(Value::Array(items)) => (items, format),
                Some(_) => return Err(Error::parse("'structure' must be a list of objects")),
                None => return Err(Error::parse("no structure provided")),
            }
        },
        _ => {
            return Err(Error::parse(
                "JSON must be a list of objects or an object with a 'structure' list",
            ));
        },
    };

    let entries = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| entry_from_value(idx, item))
        .collect::<Result<Vec<_>>>()?;

    Ok(StructureSpec {
        entries: non_empty(entries)?,
        format,
    })
}

fn entry_from_value(idx: usize, item: Value) -> Result<StructureEntry> {
    let Value::Object(mut obj) = item else {
        return Err(Error::parse(format!(
            "item {}: each item must be an object with a 'path' key",
            idx + 1
        )));
    };

    let path = match obj.remove("path") {
        Some(Value::String(path)) if !path.trim().is_empty() => path.trim().to_string(),
        Some(Value::String(_)) => {
            return Err(Error::parse(format!("item {}: 'path' is empty", idx + 1)));
        },
        Some(_) => {
            return Err(Error::parse(format!(
                "item {}: 'path' must be a string",
                idx + 1
            )));
        },
        None => {
            return Err(Error::parse(format!(
                "item {}: each item must be an object with a 'path' key",
                idx + 1
            )));
        },
    };

    let content = match obj.remove("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(content)) => content,
        Some(_) => {
            return Err(Error::parse(format!(
                "item {}: 'content' must be a string",
                idx + 1
            )));
        },
    };

    Ok(StructureEntry { path, content })
}

/// Reject structures with more than `max_entries` entries.
pub fn ensure_within_limit(entries: &[StructureEntry], max_entries: usize) -> Result<()> {
    if entries.len() > max_entries {
        return Err(Error::parse(format!(
            "structure has {} entries, the limit is {max_entries}",
            entries.len()
        )));
    }
    Ok(())
}

fn non_empty(entries: Vec<StructureEntry>) -> Result<Vec<StructureEntry>> {
    if entries.is_empty() {
        return Err(Error::parse("no structure entries provided"));
    }
    Ok(entries)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn lines_skip_blanks_and_trim() {
        let entries = parse_lines("folder1/\n\n  folder1/file1.txt  \r\n   \n").unwrap();
        assert_eq!(entries, vec![
            StructureEntry::path("folder1/"),
            StructureEntry::path("folder1/file1.txt"),
        ]);
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());
    }

    #[test]
    fn lines_only_whitespace_is_rejected() {
        let err = parse_lines("\n   \n").unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "no structure entries provided");
    }

    #[test]
    fn json_bare_list_defaults_content() {
        let spec =
            parse_json(r#"[{"path": "a.txt", "content": "hi"}, {"path": "dir/"}, {"path": "b", "content": null}]"#)
                .unwrap();
        assert_eq!(spec.format, None);
        assert_eq!(spec.entries, vec![
            StructureEntry::new("a.txt", "hi"),
            StructureEntry::path("dir/"),
            StructureEntry::path("b"),
        ]);
    }

    #[test]
    fn json_wrapped_structure_with_format() {
        let spec = parse_json(
            r#"{"format": "tar.gz", "structure": [{"path": "src/main.rs", "content": "fn main() {}"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.format, Some(ArchiveFormat::TarGz));
        assert_eq!(spec.entries.len(), 1);
        assert_eq!(spec.entries[0].content, "fn main() {}");
    }

    #[rstest]
    #[case::unknown_name("rar")]
    #[case::blank("")]
    fn json_unknown_format_is_zip(#[case] format: &str) {
        let spec = parse_json(&format!(
            r#"{{"format": "{format}", "structure": [{{"path": "a"}}]}}"#
        ))
        .unwrap();
        assert_eq!(spec.format, Some(ArchiveFormat::Zip));
    }

    #[test]
    fn json_non_string_format_is_rejected() {
        let err = parse_json(r#"{"format": 7, "structure": [{"path": "a"}]}"#).unwrap_err();
        assert!(err.to_string().contains("'format' must be a string"));
    }

    #[test]
    fn malformed_json_surfaces_serde_message() {
        let err = parse_json(r#"[{"path": "a.txt""#).unwrap_err();
        assert!(err.is_parse());
        assert!(
            err.to_string().contains("line 1"),
            "expected raw serde position in message, got: {err}"
        );
    }

    #[rstest]
    #[case::scalar(r#""just a string""#, "JSON must be a list")]
    #[case::missing_path(r#"[{"content": "x"}]"#, "item 1: each item must be an object with a 'path' key")]
    #[case::not_object(r#"["a.txt"]"#, "item 1: each item must be an object")]
    #[case::numeric_content(r#"[{"path": "a", "content": 3}]"#, "'content' must be a string")]
    #[case::empty_list("[]", "no structure entries provided")]
    #[case::object_without_structure(r#"{"files": []}"#, "no structure provided")]
    fn json_shape_errors(#[case] raw: &str, #[case] expected: &str) {
        let err = parse_json(raw).unwrap_err();
        assert!(err.is_parse());
        assert!(
            err.to_string().contains(expected),
            "expected {expected:?} in {err}"
        );
    }

    #[rstest]
    #[case(Some("structure.json"), InputKind::Json)]
    #[case(Some("STRUCTURE.JSON"), InputKind::Json)]
    #[case(Some("paths.txt"), InputKind::Lines)]
    #[case(Some("json"), InputKind::Lines)]
    #[case(None, InputKind::Lines)]
    fn input_kind_from_file_name(#[case] name: Option<&str>, #[case] expected: InputKind) {
        assert_eq!(InputKind::from_file_name(name), expected);
    }

    #[test]
    fn entry_limit() {
        let entries = vec![StructureEntry::path("a"), StructureEntry::path("b")];
        assert!(ensure_within_limit(&entries, 2).is_ok());
        let err = ensure_within_limit(&entries, 1).unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "structure has 2 entries, the limit is 1");
    }

    #[test]
    fn parse_dispatches_on_kind() {
        let from_lines = parse("a.txt\nb/", InputKind::Lines).unwrap();
        assert_eq!(from_lines.len(), 2);
        let from_json = parse(r#"{"structure": [{"path": "a.txt"}]}"#, InputKind::Json).unwrap();
        assert_eq!(from_json, vec![StructureEntry::path("a.txt")]);
    }
}
