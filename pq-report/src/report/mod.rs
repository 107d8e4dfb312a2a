//! Plain-text monthly report and optional JSON sidecar.

use std::{fmt::Write as _, path::PathBuf};

use anyhow::Context;
use pq_core::{
    domain::{format_duration, Dimension, Finding, ReportingPeriod},
    SiteAssessment,
};
use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
);

const RULE: &str =
    "################################################################################";

/// Explanatory notes printed under each section.
pub fn footnotes(dimension: Dimension) -> &'static [&'static str] {
    match dimension {
        Dimension::Power => &[],
        Dimension::PowerFactor => &[
            "Power Factor Correction may be required if your power factor slips below 0.9 for more than 5 hours in a 30-day period. Failing to correct a poor PF not only leads to much higher power bills, it may significantly damage sensitive electrical components in equipment and machinery.",
        ],
        Dimension::VoltageFluctuation => &[
            "Voltage fluctuations are defined as repetitive or random variations in the magnitude of the supply voltage which may cause spurious tripping of relays, interference with communication equipment, or even severe fluctuations may not allow other loads to be started due to the reduction in supply voltage. Additionally, induction motors that operate at maximum torque may stall if voltage fluctuations are of significant magnitude.",
            "The foremost effect of voltage fluctuations is lamp flicker. Lamp flicker is quantified using a measure called the short-term flicker index (Pst), which is normalized to 1.0 to represent the conventional threshold of irritability to the human eye.",
            "In general, the magnitudes of these variations should not exceed 7% of the nominal supply voltage for more than 5% of the 30-day period, and Flicker Pst values should not exceed 1 for 95% of the 30-day period.",
        ],
        Dimension::Unbalance => &[
            "The greatest effect of voltage unbalance is on three-phase induction motors. This will lead to a reduction in motor efficiency while reducing the insulation life caused by overheating.",
            "The negative sequence voltage unbalance should remain under 2%, and the current unbalance under 50%, both of which should remain below the thresholds for at least 95% of the 30-day period.",
        ],
        Dimension::Harmonics => &[
            "Excessive harmonics are a concern as they may cause heating in synchronous/induction machines, interference in communication systems, or damage to capacitors and computers.",
            "Total Harmonic Distortion should not exceed 5% for more than 5% of a 30-day period, and the Total Demand Distortion should not exceed 25% for more than 25% of a 30-day period.",
        ],
        Dimension::GroundCurrent => &[
            "The National Electrical Code (NEC) mandates that a ground cannot serve as a current-carrying conductor. While any amount of current over 10 milliamps (0.01 A) can produce painful to severe shock, currents between 100 and 200 mA (0.1 to 0.2 A) are lethal. Currents above 200 milliamps (0.2 A), while producing severe burns and unconsciousness, do not usually cause death if the victim is given immediate attention. Resuscitation, consisting of artificial respiration, will usually revive the victim.",
            "Ground current is flagged whenever it exceeds a threshold of 100 milliamps (0.1 A).",
        ],
    }
}

/// `"{display name} - {Month YYYY}.txt"`, with path separators replaced.
pub fn report_file_name(display_name: &str, period: &ReportingPeriod) -> String {
    let name: String = display_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("{name} - {}.txt", period.label())
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("report text formatting failed: {0}")]
    Text(#[from] std::fmt::Error),
}

fn timestamp(ts: OffsetDateTime) -> Result<String, RenderError> {
    Ok(ts.format(TIMESTAMP_FORMAT)?)
}

fn write_period(
    out: &mut String,
    heading: &str,
    period: &ReportingPeriod,
) -> Result<(), RenderError> {
    writeln!(out, "+++ {heading} +++")?;
    writeln!(out, "Start time: {}", timestamp(period.start())?)?;
    writeln!(out, "End time: {}", timestamp(period.end())?)?;
    writeln!(out, "Duration: {}", format_duration(period.duration()))?;
    Ok(())
}

fn write_section(out: &mut String, finding: &Finding) -> std::fmt::Result {
    writeln!(out, "\n\n{}", finding.dimension.title())?;
    for line in &finding.conclusions {
        writeln!(out, "{line}")?;
    }
    if let Some(rec) = &finding.recommendation {
        writeln!(out, "Recommendation: {rec}")?;
    }
    let notes = footnotes(finding.dimension);
    if !notes.is_empty() {
        out.push('\n');
        for note in notes {
            writeln!(out, "* {note}")?;
        }
    }
    Ok(())
}

/// Render the report: a header with the site configuration and both periods,
/// then one section per dimension in report order.
pub fn render_report(
    display_name: &str,
    assessment: &SiteAssessment,
) -> Result<String, RenderError> {
    let mut out = String::new();
    let site = &assessment.site;
    writeln!(
        out,
        "###################    Monthly report for {display_name}  ##################"
    )?;
    writeln!(
        out,
        "Nominal Phase to Neutral Voltage: {} Volts",
        site.nominal_phase_to_neutral
    )?;
    writeln!(
        out,
        "Nominal Phase to Phase Voltage: {} Volts",
        site.nominal_phase_to_phase
    )?;
    writeln!(out, "Wiring Configuration: {}", site.wiring)?;
    out.push('\n');
    write_period(&mut out, "This Period", &assessment.current_period)?;
    out.push('\n');
    write_period(&mut out, "Prev Period", &assessment.previous_period)?;
    writeln!(out, "{RULE}")?;

    for finding in assessment.findings() {
        write_section(&mut out, finding)?;
    }
    Ok(out)
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    site_name: &'a str,
    #[serde(flatten)]
    assessment: &'a SiteAssessment,
}

/// Writes rendered reports into one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    write_json: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, write_json: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_json,
        }
    }

    /// Write the text report, and the JSON sidecar when enabled. Returns the
    /// path of the text report.
    pub async fn write(
        &self,
        display_name: &str,
        assessment: &SiteAssessment,
    ) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;

        let text = render_report(display_name, assessment)
            .with_context(|| format!("failed to render report for {display_name}"))?;
        let path = self
            .output_dir
            .join(report_file_name(display_name, &assessment.current_period));
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        if self.write_json {
            let doc = ReportDocument {
                site_name: display_name,
                assessment,
            };
            let json = serde_json::to_string_pretty(&doc)?;
            let json_path = path.with_extension("json");
            tokio::fs::write(&json_path, json)
                .await
                .with_context(|| format!("failed to write {}", json_path.display()))?;
        }

        tracing::info!(
            site_id = %assessment.site_id,
            path = %path.display(),
            "report written"
        );
        Ok(path)
    }
}
