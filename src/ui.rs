use crate::present::{ChartSpec, TableRow, TABLE_COLUMNS};
use crate::shell::ShellView;
use std::fmt::Write;

const CHART_WIDTH: f64 = 720.0;
const CHART_HEIGHT: f64 = 320.0;
const PAD_LEFT: f64 = 48.0;
const PAD_RIGHT: f64 = 16.0;
const PAD_TOP: f64 = 40.0;
const PAD_BOTTOM: f64 = 56.0;

pub fn render_index(view: &ShellView) -> String {
    let selected = view.filter.to_string();
    let options = view
        .options
        .iter()
        .map(|(label, value)| {
            let selected = if *value == selected { " selected" } else { "" };
            format!(
                r#"<option value="{}"{selected}>{}</option>"#,
                escape_html(value),
                escape_html(label)
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ");

    let message = view
        .message
        .as_deref()
        .map(|message| format!(r#"<p class="message">{}</p>"#, escape_html(message)))
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{STATE}}", view.state)
        .replace("{{OPTIONS}}", &options)
        .replace("{{MESSAGE}}", &message)
        .replace("{{CHART}}", &render_chart(view.chart.as_ref()))
        .replace("{{SUMMARY}}", &escape_html(&view.summary))
        .replace("{{TABLE}}", &render_table(&view.table))
}

/// Stacked bars as inline SVG. An absent chart renders an empty frame.
pub fn render_chart(chart: Option<&ChartSpec>) -> String {
    let mut svg = format!(
        r#"<svg id="chart" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" role="img" aria-label="Customers per half hour">"#
    );
    let Some(chart) = chart.filter(|chart| !chart.is_empty()) else {
        svg.push_str("</svg>");
        return svg;
    };

    let plot_width = CHART_WIDTH - PAD_LEFT - PAD_RIGHT;
    let plot_height = CHART_HEIGHT - PAD_TOP - PAD_BOTTOM;
    let baseline = CHART_HEIGHT - PAD_BOTTOM;
    let max = chart.max_stack().max(1) as f64;
    let slot = plot_width / chart.categories.len() as f64;
    let bar_width = slot * 0.6;
    let label_every = chart.categories.len().div_ceil(16);

    let _ = write!(
        svg,
        r#"<text class="chart-title" x="{}" y="22" text-anchor="middle">{}</text>"#,
        CHART_WIDTH / 2.0,
        escape_html(&chart.title)
    );

    let ticks = 4;
    for tick in 0..=ticks {
        let value = max * f64::from(tick) / f64::from(ticks);
        let y = baseline - plot_height * f64::from(tick) / f64::from(ticks);
        let _ = write!(
            svg,
            r#"<line class="chart-grid" x1="{PAD_LEFT}" y1="{y:.1}" x2="{}" y2="{y:.1}" /><text class="chart-label" x="{}" y="{:.1}" text-anchor="end">{}</text>"#,
            CHART_WIDTH - PAD_RIGHT,
            PAD_LEFT - 8.0,
            y + 4.0,
            format_tick(value)
        );
    }

    for (index, category) in chart.categories.iter().enumerate() {
        let x = PAD_LEFT + slot * index as f64 + (slot - bar_width) / 2.0;
        let mut top = baseline;
        for series in &chart.series {
            let value = series.values.get(index).copied().unwrap_or(0);
            if value == 0 {
                continue;
            }
            let height = plot_height * value as f64 / max;
            top -= height;
            let _ = write!(
                svg,
                r#"<rect class="bar" x="{x:.1}" y="{top:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{}"><title>{} {}: {value}</title></rect>"#,
                escape_html(&series.color),
                escape_html(&series.name),
                escape_html(category)
            );
        }
        if index % label_every == 0 {
            let _ = write!(
                svg,
                r#"<text class="chart-label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x + bar_width / 2.0,
                baseline + 18.0,
                escape_html(category)
            );
        }
    }

    let _ = write!(
        svg,
        r#"<text class="chart-label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
        PAD_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 12.0,
        escape_html(&chart.x_title)
    );
    for (index, series) in chart.series.iter().enumerate() {
        let x = CHART_WIDTH - PAD_RIGHT - 180.0 + 90.0 * index as f64;
        let _ = write!(
            svg,
            r#"<rect x="{x}" y="30" width="10" height="10" fill="{}" /><text class="chart-label" x="{}" y="39">{}</text>"#,
            escape_html(&series.color),
            x + 14.0,
            escape_html(&series.name)
        );
    }

    svg.push_str("</svg>");
    svg
}

pub fn render_table(rows: &[TableRow]) -> String {
    let mut html = String::from("<table id=\"table\"><thead><tr>");
    for column in TABLE_COLUMNS {
        let _ = write!(html, "<th>{column}</th>");
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str(if row.highlight { r#"<tr class="total">"# } else { "<tr>" });
        for cell in row.cells() {
            let _ = write!(html, "<td>{}</td>", escape_html(&cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn format_tick(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Visit Stats</title>
  <style>
    :root {
      --bg: #f5f7fa;
      --ink: #2b2a28;
      --accent: #1f77b4;
      --stripe: #f9f9f9;
      --stripe-alt: #e0f0ff;
      --highlight: #ffd700;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 20px;
      background: var(--bg);
      color: var(--ink);
      font-family: Arial, sans-serif;
    }

    h1 {
      text-align: center;
      margin-bottom: 30px;
      color: var(--accent);
    }

    .controls {
      display: flex;
      align-items: center;
      gap: 20px;
      margin-bottom: 20px;
    }

    .controls label {
      font-weight: bold;
    }

    select {
      width: 300px;
      padding: 5px;
    }

    button {
      background: var(--accent);
      color: white;
      border: none;
      padding: 5px 15px;
      cursor: pointer;
      font-weight: bold;
    }

    #chart {
      width: 100%;
      height: 400px;
      display: block;
      margin-bottom: 30px;
      background: white;
    }

    .chart-title {
      font-size: 16px;
      font-weight: bold;
    }

    .chart-grid {
      stroke: rgba(0, 0, 0, 0.1);
    }

    .chart-label {
      fill: #555;
      font-size: 11px;
    }

    .summary {
      margin-bottom: 20px;
      font-weight: bold;
      font-size: 18px;
      min-height: 1.2em;
    }

    .message {
      color: #c63b2b;
      font-weight: bold;
    }

    .table-wrap {
      overflow-x: auto;
      border: 1px solid #ccc;
      border-radius: 5px;
      margin-bottom: 50px;
    }

    table {
      min-width: 900px;
      width: 100%;
      border-collapse: collapse;
    }

    th {
      background: var(--accent);
      color: white;
      font-weight: bold;
      font-size: 15px;
      padding: 10px;
    }

    td {
      text-align: center;
      padding: 10px;
      font-size: 14px;
    }

    td:first-child {
      text-align: left;
      width: 150px;
    }

    tbody tr:nth-child(odd) {
      background: var(--stripe);
    }

    tbody tr:nth-child(even) {
      background: var(--stripe-alt);
    }

    tbody tr.total {
      background: var(--highlight);
      font-weight: bold;
      font-size: 16px;
      color: black;
    }
  </style>
</head>
<body data-state="{{STATE}}">
  <h1>Visit Stats</h1>

  <form class="controls" method="post" action="/analyze">
    <label for="date">Select date:</label>
    <select id="date" name="date">
          {{OPTIONS}}
    </select>
    <button id="analyze" type="submit">Analyze</button>
  </form>

  {{MESSAGE}}
  {{CHART}}

  <div class="summary" id="summary">{{SUMMARY}}</div>

  <div class="table-wrap">
    {{TABLE}}
  </div>
</body>
</html>
"#;
