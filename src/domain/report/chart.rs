// ============================================================
// CHART MODEL
// ============================================================
// Backend-neutral description of a (grouped) bar chart. Duplicate
// (member, category) pairs are averaged, missing values skipped.

use serde::Serialize;

use super::MeltedRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Palette {
    /// Distinct colours per hue group
    Categorical,
    /// Sequential five-step palette, one colour per bar
    Viridis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub palette: Palette,
    pub show_legend: bool,
}

impl BarChart {
    /// Grouped bars from long-format rows. X order is first appearance of
    /// each id; hue order follows `hue_order`.
    pub fn grouped(title: &str, y_label: &str, rows: &[MeltedRow], hue_order: &[&str]) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for row in rows {
            if !categories.contains(&row.id) {
                categories.push(row.id.clone());
            }
        }

        let series = hue_order
            .iter()
            .map(|hue| Series {
                name: hue.to_string(),
                values: categories
                    .iter()
                    .map(|id| {
                        mean(
                            rows.iter()
                                .filter(|r| &r.id == id && r.category == *hue)
                                .filter_map(|r| r.value),
                        )
                    })
                    .collect(),
            })
            .collect();

        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            categories,
            series,
            palette: Palette::Categorical,
            show_legend: true,
        }
    }

    /// Single series: one bar per id
    pub fn single(title: &str, y_label: &str, rows: &[MeltedRow]) -> Self {
        let hue = rows.first().map(|r| r.category.clone()).unwrap_or_default();
        let mut chart = Self::grouped(title, y_label, rows, &[hue.as_str()]);
        chart.show_legend = false;
        chart
    }

    /// One bar per label with precomputed values
    pub fn totals(title: &str, y_label: &str, labels: &[&str], values: Vec<f64>) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            categories: labels.iter().map(|l| l.to_string()).collect(),
            series: vec![Series {
                name: y_label.to_string(),
                values: values.into_iter().map(Some).collect(),
            }],
            palette: Palette::Viridis,
            show_legend: false,
        }
    }

    /// (min, max) over all present values, always including zero
    pub fn value_bounds(&self) -> (f64, f64) {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, category: &str, value: Option<f64>) -> MeltedRow {
        MeltedRow {
            id: id.to_string(),
            category: category.to_string(),
            value,
        }
    }

    #[test]
    fn test_grouped_averages_duplicates_and_skips_missing() {
        let rows = vec![
            row("Meier", "P", Some(10.0)),
            row("Abel", "P", Some(4.0)),
            row("Meier", "P", Some(6.0)),
            row("Meier", "A", None),
            row("Abel", "A", Some(1.0)),
        ];
        let chart = BarChart::grouped("t", "Anzahl", &rows, &["P", "A"]);
        assert_eq!(chart.categories, vec!["Meier", "Abel"]);
        assert_eq!(chart.series[0].values, vec![Some(8.0), Some(4.0)]);
        assert_eq!(chart.series[1].values, vec![None, Some(1.0)]);
    }

    #[test]
    fn test_value_bounds_include_zero() {
        let chart = BarChart::totals("t", "Anzahl", &["a", "b"], vec![3.0, 7.0]);
        assert_eq!(chart.value_bounds(), (0.0, 7.0));
        let empty = BarChart::single("t", "U", &[]);
        assert_eq!(empty.value_bounds(), (0.0, 0.0));
    }
}
