// ============================================================
// PAGE RENDERING
// ============================================================
// Server-rendered HTML. All selections live in one GET form
// (`#view`); widgets outside the sidebar join it via `form="view"`.

use crate::domain::report::{Block, Dashboard, LoadedReport, TableView, ViewOptions};
use crate::shared::html::escape;

const TITLE: &str = "BNI Chapter Gulda - Dashboard";

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; color: #262730; display: flex; min-height: 100vh; }
aside { width: 300px; flex-shrink: 0; background: #f0f2f6; padding: 1rem 1.25rem; box-sizing: border-box; }
main { flex: 1; padding: 1rem 2rem; min-width: 0; }
h1 { margin-top: 0.5rem; }
.notice { padding: 0.6rem 0.8rem; border-radius: 6px; margin: 0.5rem 0; white-space: pre-wrap; }
.success { background: #dff5e3; }
.info { background: #e1ecfb; }
.warning { background: #fff5d6; }
.error { background: #fde2e2; }
.caption { font-size: 0.85rem; color: #6b6f7b; margin: 0.25rem 0 0.75rem; }
.columns { display: flex; gap: 1.5rem; flex-wrap: wrap; }
.column { flex: 1; min-width: 320px; }
.chart svg { max-width: 100%; height: auto; }
.table-wrap { max-height: 420px; overflow: auto; margin-bottom: 1rem; }
table { border-collapse: collapse; font-size: 0.85rem; }
th, td { border: 1px solid #ddd; padding: 0.25rem 0.5rem; text-align: left; }
th { background: #fafafa; position: sticky; top: 0; }
.tabs > input { display: none; }
.tabs > label { display: inline-block; padding: 0.5rem 1rem; cursor: pointer; border-bottom: 2px solid transparent; }
.tabs > .panel { display: none; padding-top: 1rem; border-top: 1px solid #ddd; }
.picker select { width: 100%; min-height: 8rem; }
footer { margin-top: 2rem; border-top: 1px solid #ddd; padding-top: 0.5rem; color: #666; }
"#;

const UPLOAD_SCRIPT: &str = r#"
document.getElementById('upload').addEventListener('change', async (event) => {
  const file = event.target.files[0];
  if (!file) return;
  const res = await fetch('/upload?filename=' + encodeURIComponent(file.name), {
    method: 'POST',
    body: file,
    credentials: 'same-origin',
  });
  const html = await res.text();
  history.replaceState(null, '', '/');
  document.open();
  document.write(html);
  document.close();
});
"#;

const HELP: &str = r#"<h2>Hilfe</h2>
<p><strong>Anleitung:</strong></p>
<ol>
<li>Laden Sie Ihre BNI-Berichtsdatei hoch</li>
<li>Wählen Sie Sortierkriterien und Filter</li>
<li>Vergleichen Sie Mitglieder in den Visualisierungen</li>
<li>Wählen Sie einzelne Mitglieder für detaillierte Analysen</li>
</ol>
<p>Das Dashboard unterstützt sowohl das Pagisto-Format als auch das PALMS-Format.</p>"#;

const LANDING: &str = r#"<h2>BNI Chapter Gulda - Dashboard</h2>
<p>Dieses Dashboard hilft Ihnen, Ihre BNI Chapter-Daten zu visualisieren und zu analysieren.</p>
<p><strong>Funktionen:</strong></p>
<ul>
<li>Einfacher Upload von CSV- oder Excel-Dateien</li>
<li>Automatische Erkennung des Dateiformats (Pagisto oder PALMS)</li>
<li>Vergleich von Mitgliedern nach verschiedenen Kennzahlen</li>
<li>Sortierung und Filterung nach beliebigen Kriterien</li>
<li>Detaillierte Visualisierungen für alle wichtigen Kennzahlen</li>
</ul>
<p><strong>Unterstützte Kennzahlen:</strong></p>
<ul>
<li>Anwesenheit / Abwesenheit</li>
<li>Empfehlungen</li>
<li>Besucher und 1-2-1 Meetings</li>
<li>Umsatz, CTE und Testimonials</li>
<li>Punkte und Platzierung</li>
</ul>
<p>Laden Sie Ihre BNI-Berichtsdatei hoch, um zu beginnen!</p>"#;

/// Page shown when the session holds no report, optionally with an upload error
pub fn landing_page(upload_error: Option<&str>) -> String {
    let mut sidebar = upload_section(upload_error);
    sidebar.push_str(HELP);

    let main = format!(
        "{}{}",
        notice(
            "info",
            "Bitte laden Sie eine BNI-Berichtsdatei hoch, um Visualisierungen zu sehen."
        ),
        LANDING
    );
    layout(&sidebar, &main)
}

pub fn dashboard_page(report: &LoadedReport, dashboard: &Dashboard, active_tab: usize) -> String {
    let mut sidebar = upload_section(None);
    for message in &report.notices {
        sidebar.push_str(&notice("success", message));
    }
    sidebar.push_str(&notice(
        "success",
        &format!(
            "Daten erfolgreich geladen! Erkanntes Format: {}",
            report.format
        ),
    ));
    sidebar.push_str(&format!(
        r#"<p class="caption">{} | {} Zeilen | geladen um {}</p>"#,
        escape(&dashboard.file_name),
        dashboard.row_count,
        report.loaded_at.format("%H:%M:%S")
    ));
    sidebar.push_str(&dashboard.download_link);
    sidebar.push_str(
        r#"<form method="post" action="/reset"><button type="submit">Datei entfernen</button></form>"#,
    );
    sidebar.push_str(&filter_section(report, &dashboard.view));
    sidebar.push_str(HELP);

    let mut main = String::new();
    for warning in &dashboard.warnings {
        main.push_str(&notice("warning", warning));
    }
    main.push_str(&tabs(report, dashboard, active_tab));
    main.push_str("<h2>Rohdaten</h2>");
    main.push_str(&table(&dashboard.raw));
    main.push_str(&dashboard.download_link);

    layout(&sidebar, &main)
}

fn layout(sidebar: &str, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<aside>{sidebar}</aside>
<main>
<h1>{title}</h1>
<h3>Vergleichen Sie Mitglieder und analysieren Sie Kennzahlen</h3>
{main}
<footer>BNI Chapter Gulda Dashboard | Erstellt für den Chapterdirektor</footer>
</main>
<script>{script}</script>
</body>
</html>"#,
        title = TITLE,
        style = STYLE,
        sidebar = sidebar,
        main = main,
        script = UPLOAD_SCRIPT,
    )
}

fn upload_section(upload_error: Option<&str>) -> String {
    let mut html = String::from(
        r#"<h2>Daten-Upload</h2>
<label for="upload">BNI-Bericht hochladen (CSV oder Excel)</label>
<input id="upload" type="file" accept=".csv,.xls,.xlsx">"#,
    );
    if let Some(error) = upload_error {
        html.push_str(&notice(
            "error",
            &format!("Fehler beim Laden der Datei:\n{}", error),
        ));
        html.push_str(&notice(
            "info",
            "Bitte stellen Sie sicher, dass die Datei im richtigen Format vorliegt und versuchen Sie es erneut.",
        ));
    }
    html
}

fn filter_section(report: &LoadedReport, view: &ViewOptions) -> String {
    let sort_options: String = report
        .format
        .metric_options()
        .iter()
        .map(|m| option(m.label, m.label == view.sort))
        .collect();

    format!(
        r#"<h2>Filter und Sortierung</h2>
<form id="view" method="get" action="/">
<input type="hidden" name="view" value="1">
<label for="sort">Sortieren nach:</label>
<select id="sort" name="sort" onchange="this.form.submit()">{sort_options}</select>
<p><label><input type="checkbox" name="ascending" value="1" onchange="this.form.submit()"{checked}> Aufsteigend sortieren</label></p>
<label for="limit">Anzahl der Mitglieder anzeigen: <output id="limit-value">{limit}</output></label>
<input id="limit" type="range" name="limit" min="1" max="{max}" value="{limit}" oninput="document.getElementById('limit-value').value = this.value" onchange="this.form.submit()">
</form>"#,
        sort_options = sort_options,
        checked = if view.ascending { " checked" } else { "" },
        limit = view.limit,
        max = report.table.len().max(1),
    )
}

fn tabs(report: &LoadedReport, dashboard: &Dashboard, active_tab: usize) -> String {
    let active = active_tab.min(dashboard.tabs.len().saturating_sub(1));
    let mut radios = String::new();
    let mut labels = String::new();
    let mut panels = String::new();
    let mut rules = String::new();

    for (idx, tab) in dashboard.tabs.iter().enumerate() {
        radios.push_str(&format!(
            r#"<input type="radio" form="view" name="tab" value="{idx}" id="tab-{idx}"{checked}>"#,
            idx = idx,
            checked = if idx == active { " checked" } else { "" },
        ));
        labels.push_str(&format!(
            r#"<label for="tab-{}">{}</label>"#,
            idx,
            escape(&tab.title)
        ));

        let mut body = format!("<h2>{}</h2>", escape(&tab.title));
        if tab.member_picker {
            body.push_str(&member_picker(report, &dashboard.view));
        }
        body.push_str(&blocks(&tab.blocks));
        panels.push_str(&format!(
            r#"<div class="panel" id="panel-{}">{}</div>"#,
            idx, body
        ));

        rules.push_str(&format!(
            "#tab-{idx}:checked ~ #panel-{idx} {{ display: block; }}\n\
             #tab-{idx}:checked ~ label[for=\"tab-{idx}\"] {{ border-bottom-color: #ff4b4b; font-weight: bold; }}\n",
            idx = idx
        ));
    }

    format!(
        r#"<style>{}</style><div class="tabs">{}{}{}</div>"#,
        rules, radios, labels, panels
    )
}

fn member_picker(report: &LoadedReport, view: &ViewOptions) -> String {
    let format = report.format;
    let members: String = report
        .table
        .text_values(format.member_key_column())
        .unwrap_or_default()
        .iter()
        .map(|m| option(m, view.members.contains(m)))
        .collect();
    let metrics: String = format
        .metric_options()
        .iter()
        .map(|m| option(m.label, view.metrics.iter().any(|s| s == m.label)))
        .collect();

    format!(
        r#"<div class="picker">
<h3>Mitglieder auswählen</h3>
<label>Wählen Sie Mitglieder zum Vergleichen:
<select multiple form="view" name="member">{}</select></label>
<label>Wählen Sie Kennzahlen zum Vergleichen:
<select multiple form="view" name="metric">{}</select></label>
<p><button type="submit" form="view">Vergleichen</button></p>
</div>"#,
        members, metrics
    )
}

fn blocks(blocks: &[Block]) -> String {
    blocks.iter().map(block).collect()
}

fn block(block: &Block) -> String {
    match block {
        Block::Heading(text) => format!("<h3>{}</h3>", escape(text)),
        Block::Chart(svg) => format!(r#"<div class="chart">{}</div>"#, svg),
        Block::Table(view) => table(view),
        Block::Warning(text) => notice("warning", text),
        Block::Error(text) => notice("error", text),
        Block::Columns(columns) => {
            let inner: String = columns
                .iter()
                .map(|col| format!(r#"<div class="column">{}</div>"#, blocks(col)))
                .collect();
            format!(r#"<div class="columns">{}</div>"#, inner)
        }
    }
}

fn table(view: &TableView) -> String {
    let head: String = view
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape(c)))
        .collect();
    let body: String = view
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|c| format!("<td>{}</td>", escape(c)))
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();

    format!(
        r#"<div class="table-wrap"><table><thead><tr>{}</tr></thead><tbody>{}</tbody></table></div>"#,
        head, body
    )
}

fn notice(kind: &str, text: &str) -> String {
    format!(r#"<div class="notice {}">{}</div>"#, kind, escape(text))
}

fn option(value: &str, selected: bool) -> String {
    format!(
        r#"<option value="{v}"{s}>{v}</option>"#,
        v = escape(value),
        s = if selected { " selected" } else { "" }
    )
}
