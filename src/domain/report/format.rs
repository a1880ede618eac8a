// ============================================================
// REPORT FORMATS
// ============================================================
// The two export layouts a chapter report can arrive in, and the
// column metadata the dashboard needs for each of them

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Header set that identifies a Pagisto export
pub const PAGISTO_COLUMNS: &[&str] = &[
    "Datum",
    "Mitglied",
    "Platzierung",
    "Abwesenheit",
    "Empfehlungen",
    "Umsatzdanke",
    "Besucher",
    "121s",
    "Testimonials",
    "CTE",
    "Punkte",
];

/// Header set that identifies a legacy PALMS export
pub const PALMS_COLUMNS: &[&str] = &[
    "Vorname",
    "Nachname",
    "P",
    "A",
    "L",
    "M",
    "S",
    "G (Eigenbedarf)",
    "G (extern)",
    "R (Eigenbedarf)",
    "R (extern)",
    "V",
    "1-2-1",
    "U",
    "CTE",
    "T",
];

const PAGISTO_NUMERIC: &[&str] = &[
    "Platzierung",
    "Abwesenheit",
    "Empfehlungen",
    "Umsatzdanke",
    "Besucher",
    "121s",
    "Testimonials",
    "CTE",
    "Punkte",
];

const PALMS_NUMERIC: &[&str] = &[
    "P",
    "A",
    "L",
    "M",
    "S",
    "G (Eigenbedarf)",
    "G (extern)",
    "R (Eigenbedarf)",
    "R (extern)",
    "V",
    "1-2-1",
    "U",
    "CTE",
    "T",
];

/// A selectable metric: label shown in the sidebar and the column behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricOption {
    pub label: &'static str,
    pub column: &'static str,
}

const fn metric(label: &'static str, column: &'static str) -> MetricOption {
    MetricOption { label, column }
}

const PALMS_METRICS: &[MetricOption] = &[
    metric("Anwesenheit (P)", "P"),
    metric("Abwesenheit (A)", "A"),
    metric("Verspätung (L)", "L"),
    metric("Medizinisch (M)", "M"),
    metric("Vertretung (S)", "S"),
    metric("Empfehlungen gegeben intern", "G (Eigenbedarf)"),
    metric("Empfehlungen gegeben extern", "G (extern)"),
    metric("Empfehlungen erhalten intern", "R (Eigenbedarf)"),
    metric("Empfehlungen erhalten extern", "R (extern)"),
    metric("Besucher (V)", "V"),
    metric("1-2-1 Meetings", "1-2-1"),
    metric("Umsatz (U)", "U"),
    metric("CTE", "CTE"),
    metric("Testimonials (T)", "T"),
];

const PAGISTO_METRICS: &[MetricOption] = &[
    metric("Platzierung", "Platzierung"),
    metric("Abwesenheit", "Abwesenheit"),
    metric("Empfehlungen", "Empfehlungen"),
    metric("Umsatz", "Umsatzdanke"),
    metric("Besucher", "Besucher"),
    metric("1-2-1 Meetings", "121s"),
    metric("Testimonials", "Testimonials"),
    metric("CTE", "CTE"),
    metric("Punkte", "Punkte"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Palms,
    Pagisto,
}

impl ReportFormat {
    pub fn key(&self) -> &'static str {
        match self {
            ReportFormat::Palms => "palms",
            ReportFormat::Pagisto => "pagisto",
        }
    }

    pub fn signature_columns(&self) -> &'static [&'static str] {
        match self {
            ReportFormat::Palms => PALMS_COLUMNS,
            ReportFormat::Pagisto => PAGISTO_COLUMNS,
        }
    }

    pub fn numeric_columns(&self) -> &'static [&'static str] {
        match self {
            ReportFormat::Palms => PALMS_NUMERIC,
            ReportFormat::Pagisto => PAGISTO_NUMERIC,
        }
    }

    pub fn metric_options(&self) -> &'static [MetricOption] {
        match self {
            ReportFormat::Palms => PALMS_METRICS,
            ReportFormat::Pagisto => PAGISTO_METRICS,
        }
    }

    pub fn metric_by_label(&self, label: &str) -> Option<MetricOption> {
        self.metric_options().iter().copied().find(|m| m.label == label)
    }

    /// Column naming a member on chart axes and in the member picker
    pub fn member_key_column(&self) -> &'static str {
        match self {
            ReportFormat::Palms => "Nachname",
            ReportFormat::Pagisto => "Mitglied",
        }
    }

    /// Columns that lead every per-member table
    pub fn identity_columns(&self) -> &'static [&'static str] {
        match self {
            ReportFormat::Palms => &["Vorname", "Nachname"],
            ReportFormat::Pagisto => &["Mitglied"],
        }
    }

    /// Share of this format's signature columns present in `columns`
    pub fn match_ratio(&self, columns: &HashSet<&str>) -> f64 {
        let signature = self.signature_columns();
        let hits = signature.iter().filter(|c| columns.contains(*c)).count();
        hits as f64 / signature.len() as f64
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Pick the format whose signature overlaps the headers best. Ties go to PALMS.
pub fn detect_format(columns: &[String]) -> ReportFormat {
    let present: HashSet<&str> = columns.iter().map(String::as_str).collect();
    let pagisto = ReportFormat::Pagisto.match_ratio(&present);
    let palms = ReportFormat::Palms.match_ratio(&present);

    if pagisto > palms {
        ReportFormat::Pagisto
    } else {
        ReportFormat::Palms
    }
}
