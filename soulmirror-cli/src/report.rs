//! Report formatting and JSON export
//!
//! **Purpose:** Terminal rendering of catalogs, questions and finished
//! reports, plus a self-describing JSON envelope for saved results.

use serde::{Deserialize, Serialize};
use soulmirror_common::catalog::TestConfig;
use soulmirror_common::session::Progress;
use soulmirror_common::{AnalysisResult, AnswerSet, Question};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format version
pub const EXPORT_VERSION: &str = "1.0";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Saved analysis: metadata, the answers given and the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportExport {
    pub session: ExportInfo,
    pub answers: AnswerSet,
    pub result: AnalysisResult,
}

/// Export metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    /// Export timestamp (RFC 3339)
    pub timestamp: String,
    pub questionnaire_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub version: String,
}

impl ReportExport {
    pub fn new(
        questionnaire_id: &str,
        title: Option<&str>,
        answers: AnswerSet,
        result: AnalysisResult,
    ) -> Self {
        Self {
            session: ExportInfo {
                timestamp: chrono::Utc::now().to_rfc3339(),
                questionnaire_id: questionnaire_id.to_string(),
                title: title.map(str::to_string),
                version: EXPORT_VERSION.to_string(),
            },
            answers,
            result,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Export report to JSON file
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Import report from JSON file
    pub fn import_json<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let export: ReportExport = serde_json::from_reader(file)?;
        Ok(export)
    }
}

/// CLI formatter for questionnaires and reports
pub struct CliFormatter;

impl CliFormatter {
    /// One line per catalog entry
    ///
    /// Example: `🐺 animal-persona    潜意识动物人格测试 (40 题)`
    pub fn format_catalog(catalog: &[TestConfig]) -> String {
        let width = catalog.iter().map(|t| t.id.len()).max().unwrap_or(0);
        let mut output = String::new();
        for entry in catalog {
            output.push_str(&format!(
                "{} {:width$}  {} ({} 题)\n    {}\n",
                entry.icon,
                entry.id,
                entry.title,
                entry.question_count,
                entry.description,
                width = width
            ));
        }
        output
    }

    /// Question with its numbered options
    pub fn format_question(question: &Question, total: usize) -> String {
        let mut output = format!("\n[{}/{}] {}\n", question.id, total, question.text);
        for option in &question.options {
            output.push_str(&format!("  {}. {}\n", option.value, option.label));
        }
        output
    }

    /// Progress bar
    ///
    /// Example: `[██████░░░░░░░░░░░░░░] 12/40 (30%)`
    pub fn format_progress(progress: &Progress) -> String {
        const WIDTH: usize = 20;
        let filled = if progress.total == 0 {
            0
        } else {
            (progress.answered * WIDTH / progress.total).min(WIDTH)
        };
        format!(
            "[{}{}] {}/{} ({:.0}%)",
            "█".repeat(filled),
            "░".repeat(WIDTH - filled),
            progress.answered,
            progress.total,
            progress.percent()
        )
    }

    /// Full report for terminal display
    pub fn format_report(result: &AnalysisResult) -> String {
        let mut output = String::new();

        output.push_str("\n╔════════════════════════════════════════╗\n");
        output.push_str(&format!("  你的灵魂原型：{}\n", result.main_archetype));
        output.push_str(&format!("  辅助原型：{}\n", result.secondary_archetype));
        output.push_str("╚════════════════════════════════════════╝\n\n");

        output.push_str(&format!("「{}」\n\n", result.short_quote));
        output.push_str(&format!("标签：{}\n", result.personality_traits.join(" · ")));

        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&Self::format_scores(result));
        output.push_str(&format!("{}\n", RULE));

        output.push_str(&Self::format_markdown(&result.detailed_analysis));

        output.push_str(&format!("\n{}\n", RULE));
        for (_, heading, text) in result.life_aspects.entries() {
            output.push_str(&format!("\n【{}】\n{}\n", heading, text));
        }

        output
    }

    /// Horizontal bar per radar axis
    pub fn format_scores(result: &AnalysisResult) -> String {
        const WIDTH: usize = 25;
        let mut output = String::new();
        for point in &result.radar_chart {
            let max = usize::from(point.full_mark.max(1));
            let filled = (usize::from(point.value) * WIDTH / max).min(WIDTH);
            output.push_str(&format!(
                "{:<6} {}{} {:3}\n",
                point.subject,
                "▇".repeat(filled),
                " ".repeat(WIDTH - filled),
                point.value
            ));
        }
        output
    }

    /// Minimal rendering of the report markdown: headings and bold markers
    pub fn format_markdown(markdown: &str) -> String {
        let mut output = String::new();
        for line in markdown.lines() {
            let line = line.replace("**", "");
            match line.strip_prefix("### ") {
                Some(heading) => output.push_str(&format!("\n▌{}\n", heading)),
                None if line.trim().is_empty() => {}
                None => output.push_str(&format!("{}\n", line)),
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulmirror_common::chart::radar_points;
    use soulmirror_common::synthesis::LifeAspects;

    fn result() -> AnalysisResult {
        let dims: Vec<String> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        AnalysisResult {
            main_archetype: "荒原孤狼".to_string(),
            secondary_archetype: "林间灵鹿".to_string(),
            short_quote: "quote".to_string(),
            detailed_analysis: "### 核心性格底色\n你展现出了强烈的**荒原孤狼**特质。\n\n### 成长指引\n慢一点。"
                .to_string(),
            personality_traits: vec![
                "高A".to_string(),
                "B辅助".to_string(),
                "潜在C".to_string(),
                "均衡发展".to_string(),
            ],
            radar_chart: radar_points(&dims, &[100, 80, 60, 40, 20, 0]),
            life_aspects: LifeAspects {
                work: "w".to_string(),
                love: "l".to_string(),
                social: "s".to_string(),
                growth: "g".to_string(),
            },
        }
    }

    #[test]
    fn test_format_markdown_strips_markup() {
        let text = CliFormatter::format_markdown(&result().detailed_analysis);
        assert!(text.contains("▌核心性格底色"));
        assert!(text.contains("强烈的荒原孤狼特质"));
        assert!(!text.contains("**"));
        assert!(!text.contains("###"));
    }

    #[test]
    fn test_format_report_sections() {
        let text = CliFormatter::format_report(&result());
        assert!(text.contains("你的灵魂原型：荒原孤狼"));
        assert!(text.contains("高A · B辅助 · 潜在C · 均衡发展"));
        assert!(text.contains("【事业与成就】\nw"));
        assert!(text.contains("【自我成长】\ng"));
    }

    #[test]
    fn test_format_scores_bar_lengths() {
        let text = CliFormatter::format_scores(&result());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].matches('▇').count(), 25);
        assert_eq!(lines[5].matches('▇').count(), 0);
    }

    #[test]
    fn test_format_progress() {
        let bar = CliFormatter::format_progress(&Progress {
            answered: 10,
            total: 40,
        });
        assert_eq!(bar, "[█████░░░░░░░░░░░░░░░] 10/40 (25%)");
    }

    #[test]
    fn test_export_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let answers: AnswerSet = [(1, 3), (2, 4)].into_iter().collect();
        let export = ReportExport::new("animal-persona", Some("title"), answers, result());

        export.export_json(&path).unwrap();
        let imported = ReportExport::import_json(&path).unwrap();
        assert_eq!(imported, export);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["result"]["mainArchetype"], "荒原孤狼");
        assert_eq!(json["answers"]["2"], 4);
        assert_eq!(json["session"]["version"], EXPORT_VERSION);
    }
}
