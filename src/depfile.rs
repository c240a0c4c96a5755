//! Make-style depfile codec
//!
//! Depfiles record dependencies discovered only while an action runs (for
//! example by a compiler). The text form is a single Make rule:
//!
//! ```text
//! OUT1 OUT2 ... : IN1 IN2 ...
//! ```
//!
//! Literal spaces in paths are escaped as `\ `. Decoding splits on the
//! first `": "` occurrence rather than any `:`, since Windows drive
//! letters contain colons. Decoding also tolerates depfiles emitted by
//! foreign compilers, so it assumes nothing about token widths.

use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};

/// An input-file list paired with an output-file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depfile {
    /// Files the producing action read
    pub inputs: Vec<PathBuf>,
    /// Files the producing action wrote
    pub outputs: Vec<PathBuf>,
}

impl Depfile {
    /// Create a depfile from input and output path lists.
    pub fn new(inputs: Vec<PathBuf>, outputs: Vec<PathBuf>) -> Self {
        Self { inputs, outputs }
    }

    /// Render the single-line Make-rule text form.
    pub fn encode(&self) -> String {
        format!(
            "{}: {}",
            join_escaped(&self.outputs),
            join_escaped(&self.inputs)
        )
    }

    /// Parse the Make-rule text form.
    ///
    /// `path` is only used for error context. Exactly one `": "` separator
    /// is required; anything else is a [`BuildError::MalformedDepfile`].
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        // Trailing spaces are meaningful ("out: " has zero inputs), so only
        // line terminators are stripped from the end.
        let line = content.trim_start().trim_end_matches(['\n', '\r']);

        let separator = line.find(": ").ok_or_else(|| BuildError::MalformedDepfile {
            path: path.to_path_buf(),
            reason: "no ': ' separator between outputs and inputs".to_string(),
        })?;

        let outputs = split_unescaped(&line[..separator]);
        let inputs = split_unescaped(&line[separator + 2..]);

        Ok(Self { inputs, outputs })
    }
}

/// Join paths with spaces, escaping each path's internal spaces to `\ `.
fn join_escaped(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().replace(' ', "\\ "))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on unescaped spaces and reverse `\<char>` escapes in each token.
fn split_unescaped(section: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut token = String::new();
    let mut chars = section.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    token.push(escaped);
                }
            }
            ' ' => {
                if !token.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut token)));
                }
            }
            _ => token.push(c),
        }
    }

    if !token.is_empty() {
        paths.push(PathBuf::from(token));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_encode() {
        let depfile = Depfile::new(paths(&["in1", "in2"]), paths(&["out"]));
        assert_eq!(depfile.encode(), "out: in1 in2");
    }

    #[test]
    fn test_round_trip_with_escaped_space() {
        let depfile = Depfile::new(paths(&["a", "b c"]), paths(&["out"]));

        let encoded = depfile.encode();
        assert_eq!(encoded, "out: a b\\ c");

        let decoded = Depfile::parse(Path::new("test.d"), &encoded).unwrap();
        assert_eq!(decoded, depfile);
    }

    #[test]
    fn test_parse_compiler_style() {
        let decoded =
            Depfile::parse(Path::new("app.d"), "app.o : src/main.c include/app.h\n").unwrap();
        assert_eq!(decoded.outputs, paths(&["app.o"]));
        assert_eq!(decoded.inputs, paths(&["src/main.c", "include/app.h"]));
    }

    #[test]
    fn test_parse_windows_drive_letters() {
        // The drive-letter colon is not followed by a space and must not be
        // taken as the section separator.
        let decoded = Depfile::parse(
            Path::new("win.d"),
            "C:/out/app.o: C:/src/main.c C:/src/util.c",
        )
        .unwrap();
        assert_eq!(decoded.outputs, paths(&["C:/out/app.o"]));
        assert_eq!(decoded.inputs, paths(&["C:/src/main.c", "C:/src/util.c"]));
    }

    #[test]
    fn test_decode_reverses_any_escape() {
        let decoded = Depfile::parse(Path::new("esc.d"), r"out: a\ b \#weird").unwrap();
        assert_eq!(decoded.inputs, paths(&["a b", "#weird"]));
    }

    #[test]
    fn test_parse_missing_separator_fails() {
        let result = Depfile::parse(Path::new("bad.d"), "just some words");
        assert!(matches!(result, Err(BuildError::MalformedDepfile { .. })));
    }

    #[test]
    fn test_parse_multiple_outputs() {
        let decoded = Depfile::parse(Path::new("multi.d"), "a.o b.o: x.c y.c z.h").unwrap();
        assert_eq!(decoded.outputs, paths(&["a.o", "b.o"]));
        assert_eq!(decoded.inputs, paths(&["x.c", "y.c", "z.h"]));
    }

    #[test]
    fn test_parse_empty_inputs() {
        let decoded = Depfile::parse(Path::new("empty.d"), "out: ").unwrap();
        assert_eq!(decoded.outputs, paths(&["out"]));
        assert!(decoded.inputs.is_empty());
    }
}
