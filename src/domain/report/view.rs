// ============================================================
// VIEW OPTIONS
// ============================================================
// Sidebar and comparison-tab selections, rebuilt from the query
// string on every request

use serde::Serialize;

use super::{MemberTable, ReportFormat};

/// Defaults applied when the request does not carry a selection
#[derive(Debug, Clone, Copy)]
pub struct ViewDefaults {
    pub display_limit: usize,
    pub compare_members: usize,
    pub compare_metrics: usize,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            display_limit: 10,
            compare_members: 3,
            compare_metrics: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    /// Label of the metric used for sorting
    pub sort: String,
    pub ascending: bool,
    /// Number of members in the per-tab views, always in `1..=row_count`
    pub limit: usize,
    pub members: Vec<String>,
    pub metrics: Vec<String>,
}

impl ViewOptions {
    pub fn defaults(format: ReportFormat, table: &MemberTable, defaults: ViewDefaults) -> Self {
        let options = format.metric_options();
        let members = table
            .text_values(format.member_key_column())
            .unwrap_or_default()
            .into_iter()
            .take(defaults.compare_members)
            .collect();

        Self {
            sort: options.first().map(|m| m.label.to_string()).unwrap_or_default(),
            ascending: false,
            limit: clamp_limit(defaults.display_limit, table.len()),
            members,
            metrics: options
                .iter()
                .take(defaults.compare_metrics)
                .map(|m| m.label.to_string())
                .collect(),
        }
    }

    /// Apply query pairs (`sort`, `ascending`, `limit`, repeated `member`
    /// and `metric`) on top of the defaults. Once the form has been
    /// submitted (`view` present), empty member/metric lists are kept.
    pub fn from_query(
        format: ReportFormat,
        table: &MemberTable,
        defaults: ViewDefaults,
        pairs: &[(String, String)],
    ) -> Self {
        let mut view = Self::defaults(format, table, defaults);
        let submitted = pairs.iter().any(|(k, _)| k == "view");
        let known_members = table
            .text_values(format.member_key_column())
            .unwrap_or_default();

        let mut members = Vec::new();
        let mut metrics = Vec::new();
        let mut ascending = false;

        for (key, value) in pairs {
            match key.as_str() {
                "sort" if format.metric_by_label(value).is_some() => view.sort = value.clone(),
                "ascending" => ascending = matches!(value.as_str(), "1" | "true" | "on"),
                "limit" => {
                    if let Ok(limit) = value.trim().parse::<usize>() {
                        view.limit = clamp_limit(limit, table.len());
                    }
                }
                "member" if known_members.contains(value) && !members.contains(value) => {
                    members.push(value.clone())
                }
                "metric" if format.metric_by_label(value).is_some() && !metrics.contains(value) => {
                    metrics.push(value.clone())
                }
                _ => {}
            }
        }

        view.ascending = ascending;
        if submitted || !members.is_empty() {
            view.members = members;
        }
        if submitted || !metrics.is_empty() {
            view.metrics = metrics;
        }
        view
    }
}

fn clamp_limit(limit: usize, rows: usize) -> usize {
    limit.clamp(1, rows.max(1))
}
