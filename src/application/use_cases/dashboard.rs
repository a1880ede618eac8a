// ============================================================
// DASHBOARD USE CASE
// ============================================================
// Loaded report + view selections -> tabs of charts and tables.
// PALMS exports get five tabs, Pagisto exports four.

use tracing::warn;

use crate::domain::error::Result;
use crate::domain::report::{
    BarChart, Block, Dashboard, LoadedReport, MemberTable, ReportFormat, Tab, TableView,
    ViewOptions,
};
use crate::infrastructure::charts::ChartRenderer;
use crate::infrastructure::export::{download_link, DEFAULT_DOWNLOAD_NAME};

const COUNT_LABEL: &str = "Anzahl";
const REVENUE_LABEL: &str = "Umsatz (€)";

const PALMS_ATTENDANCE: &[(&str, &str)] = &[("P", "P"), ("A", "A"), ("L", "L"), ("M", "M"), ("S", "S")];
const ATTENDANCE_TOTAL_LABELS: &[&str] = &["Present", "Absent", "Late", "Medical", "Substitute"];

pub struct DashboardUseCase {
    renderer: ChartRenderer,
}

impl DashboardUseCase {
    pub fn new(renderer: ChartRenderer) -> Self {
        Self { renderer }
    }

    pub fn build(&self, report: &LoadedReport, view: &ViewOptions) -> Result<Dashboard> {
        let format = report.format;
        let sort_column = format
            .metric_by_label(&view.sort)
            .or_else(|| format.metric_options().first().copied())
            .map(|m| m.column)
            .unwrap_or_default();

        let mut warnings = Vec::new();
        let sorted = if report.table.has_column(sort_column) {
            report.table.sorted_by(sort_column, view.ascending)?
        } else {
            warnings.push(format!(
                "Die Spalte '{}' wurde nicht gefunden. Die Daten werden nicht sortiert.",
                sort_column
            ));
            report.table.clone()
        };
        let display = sorted.head(view.limit);

        let mut tabs = vec![self.compare_tab(report, view)];
        match format {
            ReportFormat::Palms => {
                tabs.push(self.palms_attendance_tab(&report.table, &display, view));
                tabs.push(self.palms_referrals_tab(&display));
                tabs.push(self.visitors_tab(format, &display, ("V", "1-2-1")));
                tabs.push(self.palms_revenue_tab(&display));
            }
            ReportFormat::Pagisto => {
                tabs.push(self.pagisto_attendance_tab(&display));
                tabs.push(self.visitors_tab(format, &display, ("Besucher", "121s")));
                tabs.push(self.pagisto_revenue_tab(&display));
            }
        }

        Ok(Dashboard {
            format,
            file_name: report.file_name.clone(),
            row_count: report.table.len(),
            view: view.clone(),
            warnings,
            tabs,
            raw: TableView::from(&report.table),
            download_link: download_link(&report.table, DEFAULT_DOWNLOAD_NAME)?,
        })
    }

    // ---- shared tabs ---------------------------------------------------

    fn compare_tab(&self, report: &LoadedReport, view: &ViewOptions) -> Tab {
        let format = report.format;
        let mut blocks = Vec::new();

        if view.members.is_empty() {
            blocks.push(Block::Warning(
                "Bitte wählen Sie mindestens ein Mitglied aus.".to_string(),
            ));
        } else if !view.metrics.is_empty() {
            blocks.extend(contain("Mitgliedervergleich", || {
                let key = format.member_key_column();
                let selected = report.table.filter_by(key, &view.members)?;

                let metrics: Vec<(&str, &str)> = view
                    .metrics
                    .iter()
                    .filter_map(|label| format.metric_by_label(label))
                    .filter(|m| selected.has_column(m.column))
                    .map(|m| (m.column, m.label))
                    .collect();

                if metrics.is_empty() {
                    return Ok(vec![Block::Warning(
                        "Keine Daten für die ausgewählten Kennzahlen gefunden.".to_string(),
                    )]);
                }

                let mut columns: Vec<&str> = format.identity_columns().to_vec();
                columns.extend(metrics.iter().map(|(column, _)| *column));

                Ok(vec![
                    Block::Heading("Vergleich der ausgewählten Mitglieder".to_string()),
                    self.grouped_chart(
                        &selected,
                        key,
                        "Kennzahlen pro Mitglied",
                        "Wert",
                        &metrics,
                    )?,
                    Block::Heading("Detaillierte Daten".to_string()),
                    table_block(&selected, &columns)?,
                ])
            }));
        }

        Tab {
            title: "Mitgliedervergleich".to_string(),
            blocks,
            member_picker: true,
        }
    }

    fn visitors_tab(&self, format: ReportFormat, display: &MemberTable, columns: (&str, &str)) -> Tab {
        let key = format.member_key_column();
        let (visitors, meetings) = columns;
        let mut table_columns: Vec<&str> = format.identity_columns().to_vec();
        table_columns.extend([visitors, meetings]);

        let blocks = contain("Besucher & 1-2-1", || {
            Ok(vec![
                self.grouped_chart(
                    display,
                    key,
                    "Besucher und 1-2-1 Meetings",
                    COUNT_LABEL,
                    &[(visitors, "Besucher"), (meetings, "1-2-1 Meetings")],
                )?,
                Block::Heading("Besucher und 1-2-1 Meetings pro Mitglied".to_string()),
                table_block(display, &table_columns)?,
            ])
        });

        Tab {
            title: "Besucher & 1-2-1".to_string(),
            blocks,
            member_picker: false,
        }
    }

    // ---- PALMS ---------------------------------------------------------

    fn palms_attendance_tab(&self, full: &MemberTable, display: &MemberTable, view: &ViewOptions) -> Tab {
        let per_member = contain("Anwesenheit", || {
            Ok(vec![self.grouped_chart(
                display,
                "Nachname",
                &format!("Top {} Mitglieder nach {}", view.limit, view.sort),
                COUNT_LABEL,
                PALMS_ATTENDANCE,
            )?])
        });

        let totals = contain("Gesamte Anwesenheitsverteilung", || {
            let values = PALMS_ATTENDANCE
                .iter()
                .map(|(column, _)| full.column_sum(column))
                .collect::<Result<Vec<_>>>()?;
            let chart = BarChart::totals(
                "Gesamte Anwesenheitsverteilung",
                COUNT_LABEL,
                ATTENDANCE_TOTAL_LABELS,
                values,
            );
            Ok(vec![self.chart(&chart)?])
        });

        let mut blocks = vec![Block::Columns(vec![per_member, totals])];
        blocks.push(Block::Heading("Anwesenheitsstatistiken pro Mitglied".to_string()));
        blocks.extend(contain("Anwesenheitstabelle", || {
            Ok(vec![table_block(display, &["Vorname", "Nachname", "P", "A", "L", "M", "S"])?])
        }));

        Tab {
            title: "Anwesenheit".to_string(),
            blocks,
            member_picker: false,
        }
    }

    fn palms_referrals_tab(&self, display: &MemberTable) -> Tab {
        let given = contain("Empfehlungen gegeben", || {
            Ok(vec![self.grouped_chart(
                display,
                "Nachname",
                "Empfehlungen gegeben (intern vs. extern)",
                COUNT_LABEL,
                &[("G (Eigenbedarf)", "Intern gegeben"), ("G (extern)", "Extern gegeben")],
            )?])
        });

        let received = contain("Empfehlungen erhalten", || {
            Ok(vec![self.grouped_chart(
                display,
                "Nachname",
                "Empfehlungen erhalten (intern vs. extern)",
                COUNT_LABEL,
                &[("R (Eigenbedarf)", "Intern erhalten"), ("R (extern)", "Extern erhalten")],
            )?])
        });

        let mut blocks = vec![Block::Columns(vec![given, received])];
        blocks.push(Block::Heading("Empfehlungsstatistiken pro Mitglied".to_string()));
        blocks.extend(contain("Empfehlungstabelle", || {
            let with_totals = display
                .with_sum_column("Empfehlungen_gegeben", "G (Eigenbedarf)", "G (extern)")?
                .with_sum_column("Empfehlungen_erhalten", "R (Eigenbedarf)", "R (extern)")?;
            Ok(vec![table_block(
                &with_totals,
                &[
                    "Vorname",
                    "Nachname",
                    "G (Eigenbedarf)",
                    "G (extern)",
                    "Empfehlungen_gegeben",
                    "R (Eigenbedarf)",
                    "R (extern)",
                    "Empfehlungen_erhalten",
                ],
            )?])
        }));

        Tab {
            title: "Empfehlungen".to_string(),
            blocks,
            member_picker: false,
        }
    }

    fn palms_revenue_tab(&self, display: &MemberTable) -> Tab {
        let revenue = contain("Umsatz", || {
            Ok(vec![self.single_chart(display, "Nachname", "U", "Umsatz pro Mitglied", REVENUE_LABEL)?])
        });

        let education = contain("CTE und Testimonials", || {
            Ok(vec![self.grouped_chart(
                display,
                "Nachname",
                "CTE und Testimonials pro Mitglied",
                COUNT_LABEL,
                &[("CTE", "CTE"), ("T", "Testimonials")],
            )?])
        });

        let mut blocks = vec![Block::Columns(vec![revenue, education])];
        blocks.push(Block::Heading("Umsatz, CTE und Testimonials pro Mitglied".to_string()));
        blocks.extend(contain("Umsatztabelle", || {
            Ok(vec![table_block(display, &["Vorname", "Nachname", "U", "CTE", "T"])?])
        }));

        Tab {
            title: "Umsatz & Bildung".to_string(),
            blocks,
            member_picker: false,
        }
    }

    // ---- Pagisto -------------------------------------------------------

    fn pagisto_attendance_tab(&self, display: &MemberTable) -> Tab {
        let absence = contain("Abwesenheit", || {
            Ok(vec![
                self.single_chart(display, "Mitglied", "Abwesenheit", "Anwesenheitsstatistiken", "Abwesenheit")?,
                table_block(display, &["Mitglied", "Abwesenheit"])?,
            ])
        });

        let referrals = contain("Empfehlungen", || {
            Ok(vec![
                self.single_chart(display, "Mitglied", "Empfehlungen", "Empfehlungsstatistiken", "Empfehlungen")?,
                table_block(display, &["Mitglied", "Empfehlungen"])?,
            ])
        });

        Tab {
            title: "Anwesenheit & Empfehlungen".to_string(),
            blocks: vec![Block::Columns(vec![absence, referrals])],
            member_picker: false,
        }
    }

    fn pagisto_revenue_tab(&self, display: &MemberTable) -> Tab {
        let revenue = contain("Umsatz", || {
            Ok(vec![
                self.single_chart(display, "Mitglied", "Umsatzdanke", "Umsatz pro Mitglied", REVENUE_LABEL)?,
                table_block(display, &["Mitglied", "Umsatzdanke"])?,
            ])
        });

        let education = contain("CTE und Testimonials", || {
            Ok(vec![
                self.grouped_chart(
                    display,
                    "Mitglied",
                    "CTE und Testimonials pro Mitglied",
                    COUNT_LABEL,
                    &[("CTE", "CTE"), ("Testimonials", "Testimonials")],
                )?,
                table_block(display, &["Mitglied", "CTE", "Testimonials"])?,
            ])
        });

        Tab {
            title: "Umsatz & Bildung".to_string(),
            blocks: vec![Block::Columns(vec![revenue, education])],
            member_picker: false,
        }
    }

    // ---- helpers -------------------------------------------------------

    fn chart(&self, chart: &BarChart) -> Result<Block> {
        Ok(Block::Chart(self.renderer.render_svg(chart)?))
    }

    fn grouped_chart(
        &self,
        table: &MemberTable,
        key: &str,
        title: &str,
        y_label: &str,
        columns: &[(&str, &str)],
    ) -> Result<Block> {
        let melted = table.melt(key, columns)?;
        let hues: Vec<&str> = columns.iter().map(|(_, label)| *label).collect();
        self.chart(&BarChart::grouped(title, y_label, &melted, &hues))
    }

    fn single_chart(
        &self,
        table: &MemberTable,
        key: &str,
        column: &str,
        title: &str,
        y_label: &str,
    ) -> Result<Block> {
        let melted = table.melt(key, &[(column, column)])?;
        self.chart(&BarChart::single(title, y_label, &melted))
    }
}

fn table_block(table: &MemberTable, columns: &[&str]) -> Result<Block> {
    Ok(Block::Table(TableView::from(&table.select(columns)?)))
}

/// Run one section; a failure becomes an error block instead of failing the page
fn contain<F>(section: &str, build: F) -> Vec<Block>
where
    F: FnOnce() -> Result<Vec<Block>>,
{
    match build() {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!(section = section, error = %e, "Dashboard section failed");
            vec![Block::Error(format!("{}: {}", section, e))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::load_report::prepare_table;
    use crate::domain::report::{Cell, ViewDefaults, PAGISTO_COLUMNS, PALMS_COLUMNS};

    fn report_from(columns: &[&str], rows: Vec<Vec<Cell>>) -> LoadedReport {
        let table = MemberTable::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        let (table, format) = prepare_table(table).unwrap();
        LoadedReport {
            file_name: "test.csv".to_string(),
            format,
            table,
            notices: vec![],
            loaded_at: chrono::Local::now(),
        }
    }

    fn palms_report() -> LoadedReport {
        let rows = (0..12)
            .map(|i| {
                let mut row = vec![
                    Cell::Text(format!("Vor{}", i)),
                    Cell::Text(format!("Nach{}", i)),
                ];
                row.extend((0..14).map(|j| Cell::Text(((i * j) % 7).to_string())));
                row
            })
            .collect();
        report_from(PALMS_COLUMNS, rows)
    }

    fn pagisto_report() -> LoadedReport {
        let rows = (0..4)
            .map(|i| {
                let mut row = vec![
                    Cell::Text("2024-05-01".to_string()),
                    Cell::Text(format!("Erika Muster{}", i)),
                ];
                row.extend((0..9).map(|j| Cell::Number((i + j) as f64)));
                row
            })
            .collect();
        report_from(PAGISTO_COLUMNS, rows)
    }

    fn use_case() -> DashboardUseCase {
        DashboardUseCase::new(ChartRenderer::new(600, 360))
    }

    #[test]
    fn test_palms_renders_five_tabs_without_errors() {
        let report = palms_report();
        let view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        let dashboard = use_case().build(&report, &view).unwrap();

        let titles: Vec<&str> = dashboard.tabs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Mitgliedervergleich", "Anwesenheit", "Empfehlungen", "Besucher & 1-2-1", "Umsatz & Bildung"]
        );
        assert_eq!(dashboard.error_count(), 0);
        assert_eq!(dashboard.chart_count(), 8);
        assert!(dashboard.warnings.is_empty());
        assert_eq!(dashboard.raw.rows.len(), 12);
        assert!(dashboard.download_link.contains("data:file/csv;base64,"));
    }

    #[test]
    fn test_pagisto_renders_four_tabs_without_errors() {
        let report = pagisto_report();
        let view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        let dashboard = use_case().build(&report, &view).unwrap();

        assert_eq!(dashboard.format, ReportFormat::Pagisto);
        assert_eq!(dashboard.tabs.len(), 4);
        assert_eq!(dashboard.tabs[1].title, "Anwesenheit & Empfehlungen");
        assert_eq!(dashboard.error_count(), 0);
        assert_eq!(dashboard.chart_count(), 6);
    }

    #[test]
    fn test_display_table_is_sorted_and_limited() {
        let report = pagisto_report();
        let mut view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        view.sort = "Punkte".to_string();
        view.ascending = false;
        view.limit = 2;
        let dashboard = use_case().build(&report, &view).unwrap();

        let Block::Table(table) = &dashboard.tabs[2].blocks[2] else {
            panic!("expected visitors table");
        };
        let names: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Erika Muster3", "Erika Muster2"]);
    }

    #[test]
    fn test_missing_column_is_contained_in_its_section() {
        let mut report = palms_report();
        report.table = report.table.select(&["Vorname", "Nachname", "P", "A", "L", "M", "S"]).unwrap();
        let view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        let dashboard = use_case().build(&report, &view).unwrap();

        assert_eq!(dashboard.tabs.len(), 5);
        assert!(dashboard.error_count() > 0);
        // attendance tab only needs P..S
        let attendance = serde_json::to_string(&dashboard.tabs[1]).unwrap();
        assert!(!attendance.contains(r#""kind":"error""#));
        let referrals = serde_json::to_string(&dashboard.tabs[2]).unwrap();
        assert!(referrals.contains(r#""kind":"error""#));
    }

    #[test]
    fn test_unknown_sort_column_warns_and_keeps_order() {
        let mut report = pagisto_report();
        report.table = report
            .table
            .select(&["Mitglied", "Abwesenheit", "Empfehlungen"])
            .unwrap();
        let view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        let dashboard = use_case().build(&report, &view).unwrap();

        assert_eq!(dashboard.warnings.len(), 1);
        assert!(dashboard.warnings[0].contains("'Platzierung'"));
    }

    #[test]
    fn test_compare_tab_warns_without_members() {
        let report = palms_report();
        let mut view = ViewOptions::defaults(report.format, &report.table, ViewDefaults::default());
        view.members.clear();
        let dashboard = use_case().build(&report, &view).unwrap();

        assert!(matches!(&dashboard.tabs[0].blocks[0], Block::Warning(w) if w.contains("mindestens")));
    }
}
