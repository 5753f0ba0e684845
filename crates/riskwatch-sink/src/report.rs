//! Markdown narrative of a run.

use std::cmp::Ordering;
use std::fmt::Write;

use riskwatch_types::{Segment, TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};

use crate::table::{AlertTable, ScoredRow, ScoredTable};

/// What the narrative includes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub title: String,
    /// Highest-score rows listed.
    pub top_n: usize,
    /// Most recent alerts listed.
    pub last_alerts: usize,
    /// Raw column the score is compared against for a mean absolute error line.
    pub reference_column: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Riskwatch report".into(),
            top_n: 10,
            last_alerts: 5,
            reference_column: None,
        }
    }
}

/// Renders the report from finished tables.
pub struct NarrativeReport<'a> {
    pub options: &'a ReportOptions,
    pub scored: &'a ScoredTable,
    pub alerts: &'a AlertTable,
    /// All segments of the table, least severe first.
    pub segments: &'a [Segment],
    pub alert_floor: &'a Segment,
    /// BLAKE3 hex digest of the encoded scored table.
    pub scored_digest: &'a str,
}

fn by_score_desc(a: &ScoredRow, b: &ScoredRow) -> Ordering {
    let (sa, sb) = (a.score.unwrap_or(f64::NEG_INFINITY), b.score.unwrap_or(f64::NEG_INFINITY));
    sb.total_cmp(&sa)
        .then(a.timestamp.cmp(&b.timestamp))
        .then(a.entity_id.cmp(&b.entity_id))
}

/// Markdown table cells must not break the row.
fn md(text: &str) -> String {
    text.replace('|', "\\|")
}

impl NarrativeReport<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) -> std::fmt::Result {
        let scored = self.scored;
        writeln!(out, "# {}", self.options.title)?;
        writeln!(out)?;
        writeln!(out, "- Rows: {}", scored.len())?;
        writeln!(out, "- Entities: {}", scored.entity_count())?;
        writeln!(out, "- Scored rows: {}", scored.scored_count())?;
        writeln!(
            out,
            "- Unscored rows (insufficient window): {}",
            scored.unscored_count()
        )?;
        writeln!(
            out,
            "- Alerts (segment >= {}): {}",
            self.alert_floor.label,
            self.alerts.len()
        )?;
        if let Some(reference) = &self.options.reference_column {
            match scored.mean_absolute_error(reference) {
                Some(mae) => writeln!(out, "- Mean absolute error vs `{reference}`: {mae:.2}")?,
                None => writeln!(out, "- Mean absolute error vs `{reference}`: n/a")?,
            }
        }
        writeln!(out, "- Scored table digest (BLAKE3): `{}`", self.scored_digest)?;

        writeln!(out)?;
        writeln!(out, "## Segment distribution")?;
        writeln!(out)?;
        writeln!(out, "| segment | rows |")?;
        writeln!(out, "|---|---:|")?;
        for segment in self.segments {
            writeln!(out, "| {} | {} |", md(&segment.label), scored.segment_count(segment))?;
        }

        let mut top: Vec<&ScoredRow> = scored.rows().iter().filter(|r| r.score.is_some()).collect();
        top.sort_by(|a, b| by_score_desc(a, b));
        top.truncate(self.options.top_n);
        if !top.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Top {} by score", top.len())?;
            writeln!(out)?;
            writeln!(out, "| entity_id | timestamp | score | segment |")?;
            writeln!(out, "|---|---|---:|---|")?;
            for row in top {
                writeln!(
                    out,
                    "| {} | {} | {:.3} | {} |",
                    md(row.entity_id.as_str()),
                    row.timestamp.format(TIMESTAMP_FORMAT),
                    row.score.unwrap_or_default(),
                    row.segment.as_ref().map(|s| md(&s.label)).unwrap_or_default()
                )?;
            }
        }

        let alerts = self.alerts.rows();
        let last = &alerts[alerts.len().saturating_sub(self.options.last_alerts)..];
        if !last.is_empty() {
            writeln!(out)?;
            writeln!(out, "## Last {} alerts", last.len())?;
            writeln!(out)?;
            writeln!(out, "| timestamp | entity_id | score | segment | action | reason |")?;
            writeln!(out, "|---|---|---:|---|---|---|")?;
            for alert in last {
                writeln!(
                    out,
                    "| {} | {} | {:.3} | {} | {} | {} |",
                    alert.timestamp.format(TIMESTAMP_FORMAT),
                    md(alert.entity_id.as_str()),
                    alert.score,
                    md(&alert.segment.label),
                    md(&alert.action_label),
                    md(&alert.reason)
                )?;
            }
        }
        Ok(())
    }
}
