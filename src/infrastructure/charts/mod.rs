// ============================================================
// CHART RENDERER
// ============================================================
// Draw bar charts to inline SVG with plotters

use plotters::prelude::*;

use crate::domain::error::{AppError, Result};
use crate::domain::report::{BarChart, Palette};

/// Hue colours for grouped bars
const CATEGORICAL: &[RGBColor] = &[
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const VIRIDIS: &[RGBColor] = &[
    RGBColor(68, 1, 84),
    RGBColor(59, 82, 139),
    RGBColor(33, 145, 140),
    RGBColor(94, 201, 98),
    RGBColor(253, 231, 37),
];

const MAX_LABEL_CHARS: usize = 14;

#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            width: 900,
            height: 480,
        }
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render a chart to an SVG document string
    pub fn render_svg(&self, chart: &BarChart) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_error)?;

            let slots = chart.categories.len().max(1);
            let (lo, hi) = chart.value_bounds();
            let y_top = if hi > 0.0 { hi * 1.1 } else { 1.0 };
            let y_bottom = if lo < 0.0 { lo * 1.1 } else { 0.0 };

            // one slot per category, centred on its index
            let x_range = -0.5f64..(slots as f64 - 0.5);

            let mut ctx = ChartBuilder::on(&root)
                .caption(&chart.title, ("sans-serif", 20))
                .margin(12)
                .x_label_area_size(48)
                .y_label_area_size(64)
                .build_cartesian_2d(x_range, y_bottom..y_top)
                .map_err(chart_error)?;

            let categories = &chart.categories;
            let label_for = |x: &f64| -> String {
                let idx = x.round();
                if idx < 0.0 || (x - idx).abs() > 1e-6 {
                    return String::new();
                }
                categories
                    .get(idx as usize)
                    .map(|name| shorten(name))
                    .unwrap_or_default()
            };

            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(slots)
                .x_label_formatter(&label_for)
                .x_label_style(("sans-serif", 12))
                .y_desc(chart.y_label.as_str())
                .draw()
                .map_err(chart_error)?;

            let groups = chart.series.len().max(1);
            let group_width = 0.8;
            let bar_width = group_width / groups as f64;

            for (s_idx, series) in chart.series.iter().enumerate() {
                let series_color = pick(CATEGORICAL, s_idx);
                let palette = chart.palette;
                let bars = series
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(c_idx, value)| value.map(|v| (c_idx, v)))
                    .map(move |(c_idx, v)| {
                        let left = c_idx as f64 - group_width / 2.0 + s_idx as f64 * bar_width;
                        let color = match palette {
                            Palette::Categorical => series_color,
                            Palette::Viridis => pick(VIRIDIS, c_idx),
                        };
                        Rectangle::new([(left, 0.0), (left + bar_width, v)], color.filled())
                    });

                let drawn = ctx.draw_series(bars).map_err(chart_error)?;
                if chart.show_legend {
                    drawn.label(series.name.as_str()).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 10, y + 5)], series_color.filled())
                    });
                }
            }

            if chart.show_legend && !chart.series.is_empty() {
                ctx.configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .background_style(WHITE.mix(0.85))
                    .border_style(BLACK)
                    .draw()
                    .map_err(chart_error)?;
            }

            root.present().map_err(chart_error)?;
        }
        Ok(svg)
    }
}

fn pick(palette: &[RGBColor], idx: usize) -> RGBColor {
    palette[idx % palette.len()]
}

fn shorten(name: &str) -> String {
    if name.chars().count() <= MAX_LABEL_CHARS {
        name.to_string()
    } else {
        let head: String = name.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{}…", head)
    }
}

fn chart_error<E: std::fmt::Display>(err: E) -> AppError {
    AppError::ChartError(err.to_string())
}
