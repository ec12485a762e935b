//! Runnable code blocks.
//!
//! A JavaScript/TypeScript fence becomes an embedded playground when its meta
//! mentions `runner`, `live` or `playground`, or when its first line is a
//! `// @runner ...` marker. The marker line is removed from the code and the
//! rest of it is read like fence meta.
//!
//! Meta keys: `template=`, `title=`, and `runner=<template>`. Values may be
//! double-quoted to include spaces.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Languages a playground can execute
pub const RUNNABLE_LANGUAGES: &[&str] = &["js", "jsx", "ts", "tsx", "javascript", "typescript"];

/// Template used when the meta names none
pub const DEFAULT_TEMPLATE: &str = "vanilla";

static RUNNER_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(runner|live|playground)\b").unwrap());

static RUNNER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*//\s*@runner\b(.*)$").unwrap());

static META_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)=(?:"([^"]*)"|(\S+))"#).unwrap());

/// A code block that should be rendered as a live playground
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnableCode {
    pub language: String,
    pub template: String,
    pub title: Option<String>,
    /// Source with any `// @runner` marker line removed
    pub code: String,
}

/// Options read from fence meta
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    pub template: Option<String>,
    pub title: Option<String>,
}

pub fn is_runnable_language(language: &str) -> bool {
    RUNNABLE_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(language))
}

/// Read `template=`, `title=` and `runner=` pairs from meta text
pub fn parse_runner_meta(meta: &str) -> RunnerOptions {
    let mut options = RunnerOptions::default();
    for caps in META_PAIR.captures_iter(meta) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string());
        match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
            Some("template") => options.template = value,
            Some("runner") => {
                if options.template.is_none() {
                    options.template = value;
                }
            }
            Some("title") => options.title = value,
            _ => {}
        }
    }
    options
}

/// Decide whether a code block is runnable.
///
/// ```
/// use inkpress_parser::runner::detect_runnable;
///
/// let live = detect_runnable(Some("js"), Some("runner template=\"react\""), "x()").unwrap();
/// assert_eq!(live.template, "react");
/// assert!(detect_runnable(Some("rust"), Some("runner"), "x()").is_none());
/// ```
pub fn detect_runnable(
    language: Option<&str>,
    meta: Option<&str>,
    code: &str,
) -> Option<RunnableCode> {
    let language = language.filter(|l| is_runnable_language(l))?;
    let meta = meta.unwrap_or("");

    let first_line = code.lines().next().unwrap_or("");
    let (options, code) = if let Some(caps) = RUNNER_MARKER.captures(first_line) {
        let marker_meta = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let mut options = parse_runner_meta(marker_meta);
        let from_fence = parse_runner_meta(meta);
        options.template = options.template.or(from_fence.template);
        options.title = options.title.or(from_fence.title);
        (options, strip_first_line(code))
    } else if RUNNER_FLAG.is_match(meta) {
        (parse_runner_meta(meta), code.to_string())
    } else {
        return None;
    };

    log::debug!(
        "Runnable {} block (template {:?})",
        language,
        options.template
    );
    Some(RunnableCode {
        language: language.to_string(),
        template: options
            .template
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        title: options.title,
        code,
    })
}

fn strip_first_line(code: &str) -> String {
    match code.find('\n') {
        Some(pos) => code[pos + 1..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_meta_with_template() {
        let live = detect_runnable(Some("js"), Some(r#"runner template="react""#), "render()")
            .expect("runnable");
        assert_eq!(live.template, "react");
        assert_eq!(live.code, "render()");
        assert_eq!(live.language, "js");
    }

    #[test]
    fn test_flag_words_are_case_insensitive() {
        assert!(detect_runnable(Some("ts"), Some("LIVE"), "x").is_some());
        assert!(detect_runnable(Some("tsx"), Some("Playground"), "x").is_some());
        assert!(detect_runnable(Some("ts"), Some("liveliness"), "x").is_none());
    }

    #[test]
    fn test_default_template() {
        let live = detect_runnable(Some("typescript"), Some("live"), "x").unwrap();
        assert_eq!(live.template, DEFAULT_TEMPLATE);
        assert!(live.title.is_none());
    }

    #[test]
    fn test_language_whitelist() {
        assert!(detect_runnable(Some("python"), Some("runner"), "x").is_none());
        assert!(detect_runnable(None, Some("runner"), "x").is_none());
        assert!(detect_runnable(Some("JSX"), Some("runner"), "x").is_some());
    }

    #[test]
    fn test_no_meta_is_not_runnable() {
        assert!(detect_runnable(Some("js"), None, "console.log(1)").is_none());
    }

    #[test]
    fn test_marker_line() {
        let code = "// @runner template=react title=\"Counter demo\"\nconst n = 1;\n";
        let live = detect_runnable(Some("jsx"), None, code).unwrap();
        assert_eq!(live.template, "react");
        assert_eq!(live.title.as_deref(), Some("Counter demo"));
        assert_eq!(live.code, "const n = 1;\n");
    }

    #[test]
    fn test_bare_marker_line() {
        let live = detect_runnable(Some("js"), None, "//@runner\nrun()").unwrap();
        assert_eq!(live.template, "vanilla");
        assert_eq!(live.code, "run()");
    }

    #[test]
    fn test_runner_value_sets_template() {
        let options = parse_runner_meta("runner=svelte title=\"A B\"");
        assert_eq!(options.template.as_deref(), Some("svelte"));
        assert_eq!(options.title.as_deref(), Some("A B"));
    }

    #[test]
    fn test_explicit_template_wins_over_runner_value() {
        let options = parse_runner_meta("template=react runner=svelte");
        assert_eq!(options.template.as_deref(), Some("react"));
    }
}
