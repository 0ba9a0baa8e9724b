//! Export renderers for a finished [`Analysis`].
//!
//! The pipeline never calls into this crate; callers hand it a complete
//! analysis (typically one they saved earlier) and a format selector.

use std::fmt;
use std::str::FromStr;

use rivalscope_shared::{Analysis, CompetitorProfile, Result, RivalScopeError};
use tracing::{debug, instrument};

const CSV_HEADERS: [&str; 6] = [
    "Company",
    "URL",
    "Description",
    "Pricing Tiers",
    "Key Features",
    "Marketing Tone",
];

// ---------------------------------------------------------------------------
// ExportFormat
// ---------------------------------------------------------------------------

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = RivalScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(RivalScopeError::validation("Invalid format")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// A rendered export, ready to write or serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub content_type: &'static str,
    /// Download name, `<title>.<ext>`.
    pub filename: String,
    pub body: String,
}

/// Render `analysis` in `format`.
#[instrument(skip_all, fields(analysis_id = %analysis.id, %format))]
pub fn export(analysis: &Analysis, format: ExportFormat) -> Result<ExportOutput> {
    let body = match format {
        ExportFormat::Csv => generate_csv(analysis),
        ExportFormat::Json => generate_json(analysis)?,
    };
    debug!(bytes = body.len(), "export rendered");

    Ok(ExportOutput {
        content_type: format.content_type(),
        filename: format!("{}.{}", analysis.title, format.extension()),
        body,
    })
}

/// One row per competitor, every cell quoted.
///
/// Pricing renders as `name: price` pairs and features as a list, both
/// joined by `"; "`. Rows are separated by a bare `\n`.
pub fn generate_csv(analysis: &Analysis) -> String {
    let header = csv_row(CSV_HEADERS.iter().copied());
    let rows = analysis.competitors.iter().map(|c| {
        let cells = competitor_cells(c);
        csv_row(cells.iter().map(String::as_str))
    });

    std::iter::once(header)
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty-printed full serialization.
pub fn generate_json(analysis: &Analysis) -> Result<String> {
    serde_json::to_string_pretty(analysis)
        .map_err(|e| RivalScopeError::Export(format!("failed to serialize analysis: {e}")))
}

fn competitor_cells(competitor: &CompetitorProfile) -> [String; 6] {
    let pricing = competitor
        .pricing
        .iter()
        .map(|tier| format!("{}: {}", tier.name, tier.price))
        .collect::<Vec<_>>()
        .join("; ");

    [
        competitor.name.clone(),
        competitor.url.clone(),
        competitor.description.clone(),
        pricing,
        competitor.features.join("; "),
        competitor.marketing_tone.clone(),
    ]
}

fn csv_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}
