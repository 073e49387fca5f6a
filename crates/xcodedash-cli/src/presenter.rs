//! Render a completed job's result into independent view regions.
//!
//! Each region updates only when its field is present in the new result, so
//! stale content from a previous job can persist when the new one omits a
//! field — that matches the backing dashboard contract. Code blocks carry
//! markup-escaped text for display plus the raw source as a copy payload;
//! the raw-JSON region always shows the literal, unescaped result.

use std::fmt::Write as _;

use xcodedash_client::types::AnalysisResult;

/// One entry in the model-comparison panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonEntry {
    pub label: &'static str,
    pub body: String,
}

/// One per-file code listing with a clipboard affordance keyed by filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub filename: String,
    /// Markup-escaped content, safe to embed in exported views.
    pub escaped_content: String,
    /// Raw source handed to the clipboard on request.
    pub copy_payload: String,
}

/// The four independently-updated result regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRegions {
    pub collaborative: Option<String>,
    pub comparison: Vec<ComparisonEntry>,
    pub code_blocks: Vec<CodeBlock>,
    pub raw_json: Option<String>,
}

impl ResultRegions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed result into the regions.
    pub fn apply_result(&mut self, result: &AnalysisResult) {
        if let Some(collaborative) = &result.collaborative_analysis {
            self.collaborative = Some(collaborative.clone());
        }

        // DeepSeek strictly before Gemini; absent analyses get no entry, and
        // a result with neither leaves the previous panel in place.
        let mut entries = Vec::new();
        if let Some(deepseek) = &result.deepseek_analysis {
            entries.push(ComparisonEntry {
                label: "DeepSeek",
                body: deepseek.clone(),
            });
        }
        if let Some(gemini) = &result.gemini_analysis {
            entries.push(ComparisonEntry {
                label: "Gemini",
                body: gemini.clone(),
            });
        }
        if !entries.is_empty() {
            self.comparison = entries;
        }

        if let Some(sections) = &result.code_sections {
            self.code_blocks = sections
                .iter()
                .map(|(filename, content)| CodeBlock {
                    filename: filename.clone(),
                    escaped_content: escape_markup(content),
                    copy_payload: content.clone(),
                })
                .collect();
        }

        self.raw_json = Some(result.raw_pretty());
    }

    /// Copy payload for the block keyed by `filename`.
    #[must_use]
    pub fn copy_payload(&self, filename: &str) -> Option<&str> {
        self.code_blocks
            .iter()
            .find(|block| block.filename == filename)
            .map(|block| block.copy_payload.as_str())
    }

    /// Render all populated regions as plain lines for the terminal.
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        let mut out = String::new();
        if let Some(collaborative) = &self.collaborative {
            let _ = writeln!(&mut out, "== Collaborative analysis ==");
            let _ = writeln!(&mut out, "{collaborative}");
        }
        if !self.comparison.is_empty() {
            let _ = writeln!(&mut out, "== Model comparison ==");
            for entry in &self.comparison {
                let _ = writeln!(&mut out, "-- {} --", entry.label);
                let _ = writeln!(&mut out, "{}", entry.body);
            }
        }
        if !self.code_blocks.is_empty() {
            let _ = writeln!(&mut out, "== Code sections ==");
            for block in &self.code_blocks {
                let _ = writeln!(&mut out, "-- {} (copy available) --", block.filename);
                let _ = writeln!(&mut out, "{}", block.escaped_content);
            }
        }
        if let Some(raw) = &self.raw_json {
            let _ = writeln!(&mut out, "== Raw result ==");
            let _ = writeln!(&mut out, "{raw}");
        }
        out.lines().map(std::borrow::ToOwned::to_owned).collect()
    }
}

/// Escape markup metacharacters for embedding in exported views.
#[must_use]
pub fn escape_markup(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use xcodedash_client::types::AnalysisResult;

    use super::{escape_markup, ResultRegions};

    #[test]
    fn gemini_only_result_renders_a_single_labeled_entry() {
        let mut regions = ResultRegions::new();
        regions.apply_result(&AnalysisResult::from_value(json!({
            "gemini_analysis": "use weak self"
        })));

        assert_eq!(regions.comparison.len(), 1);
        assert_eq!(regions.comparison[0].label, "Gemini");
    }

    #[test]
    fn deepseek_entry_comes_before_gemini_when_both_present() {
        let mut regions = ResultRegions::new();
        regions.apply_result(&AnalysisResult::from_value(json!({
            "gemini_analysis": "g",
            "deepseek_analysis": "d"
        })));

        let labels: Vec<&str> = regions.comparison.iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["DeepSeek", "Gemini"]);
    }

    #[test]
    fn absent_fields_leave_previous_regions_untouched() {
        let mut regions = ResultRegions::new();
        regions.apply_result(&AnalysisResult::from_value(json!({
            "collaborative_analysis": "first verdict",
            "deepseek_analysis": "d"
        })));
        regions.apply_result(&AnalysisResult::from_value(json!({
            "gemini_analysis": "second opinion"
        })));

        // Stale collaborative text persists; the comparison panel was rebuilt.
        assert_eq!(regions.collaborative.as_deref(), Some("first verdict"));
        assert_eq!(regions.comparison.len(), 1);
        assert_eq!(regions.comparison[0].label, "Gemini");
    }

    #[test]
    fn code_blocks_escape_markup_but_raw_dump_stays_literal() {
        let mut regions = ResultRegions::new();
        regions.apply_result(&AnalysisResult::from_value(json!({
            "code_sections": { "View.swift": "if a < b && c > d { \"x\" }" }
        })));

        let block = &regions.code_blocks[0];
        assert!(block.escaped_content.contains("a &lt; b &amp;&amp; c &gt; d"));
        assert!(!block.escaped_content.contains('<'));
        assert_eq!(block.copy_payload, "if a < b && c > d { \"x\" }");
        assert_eq!(
            regions.copy_payload("View.swift"),
            Some("if a < b && c > d { \"x\" }")
        );
        // The diagnostics dump carries the literal source.
        assert!(regions.raw_json.as_deref().unwrap().contains("a < b && c > d"));
    }

    #[test]
    fn escape_covers_all_metacharacters() {
        assert_eq!(escape_markup("<&>\"'"), "&lt;&amp;&gt;&quot;&#39;");
    }

    #[test]
    fn render_lines_skips_empty_regions() {
        let regions = ResultRegions::new();
        assert!(regions.render_lines().is_empty());

        let mut regions = ResultRegions::new();
        regions.apply_result(&AnalysisResult::from_value(json!({
            "collaborative_analysis": "verdict"
        })));
        let lines = regions.render_lines();
        assert!(lines.iter().any(|l| l.contains("Collaborative analysis")));
        assert!(!lines.iter().any(|l| l.contains("Model comparison")));
    }
}
