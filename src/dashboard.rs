//! Self-contained HTML dashboard.
//!
//! The page embeds every run as a table row. Numeric cells carry the raw value
//! in a `data-value` attribute; the inline script re-aggregates those rows per
//! algorithm to draw its charts and compares the result against the embedded
//! summary table, flagging any disagreement.

use crate::metrics::{AlgorithmSummary, BenchmarkRun};
use crate::report::{ReportMeta, fmt_opt, kb};
use std::fmt::Write;

/// Charting library, the page's only external reference.
pub const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

const STYLE: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
    background: #0d1117;
    color: #e6edf3;
    line-height: 1.5;
}
.container { max-width: 1400px; margin: 0 auto; padding: 32px; }
header { margin-bottom: 24px; }
h1 { font-size: 28px; font-weight: 600; color: #f0f6fc; margin-bottom: 8px; }
h2 { font-size: 18px; font-weight: 600; margin-bottom: 12px; }
.subtitle { color: #7d8590; font-size: 14px; }
.grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 16px; margin-bottom: 24px; }
@media (max-width: 1000px) { .grid { grid-template-columns: 1fr; } }
.panel {
    background: #161b22;
    border: 1px solid #30363d;
    border-radius: 8px;
    padding: 20px;
    margin-bottom: 24px;
}
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { padding: 6px 10px; border-bottom: 1px solid #30363d; text-align: right; }
th:first-child, td:first-child, th:nth-child(2), td:nth-child(2) { text-align: left; }
th { color: #7d8590; font-weight: 600; cursor: pointer; user-select: none; }
th[data-dir="asc"]::after { content: " \25B2"; }
th[data-dir="desc"]::after { content: " \25BC"; }
td { font-variant-numeric: tabular-nums; }
tr.unverified td { color: #f85149; }
input#filter {
    background: #0d1117;
    color: #e6edf3;
    border: 1px solid #30363d;
    border-radius: 6px;
    padding: 6px 10px;
    width: 320px;
    margin-bottom: 12px;
}
.warning { color: #f85149; font-weight: 600; margin-top: 8px; }
.ok { color: #3fb950; margin-top: 8px; }
"#;

const SCRIPT: &str = r#"
const COL = { file: 0, algo: 1, original: 2, compressed: 3, ratio: 4, comp: 7, decomp: 8 };
const runTable = document.getElementById('runs');
const rows = Array.from(runTable.tBodies[0].rows);

function value(row, col) {
    const v = row.cells[col].dataset.value;
    return v === undefined || v === '' ? null : Number(v);
}

function byLabel(a, b) {
    return a < b ? -1 : a > b ? 1 : 0;
}

function aggregate() {
    const groups = new Map();
    for (const row of rows) {
        const algo = row.cells[COL.algo].textContent;
        let g = groups.get(algo);
        if (!g) {
            g = { ratio: [], comp: [], decomp: [], original: 0, compressed: 0 };
            groups.set(algo, g);
        }
        for (const key of ['ratio', 'comp', 'decomp']) {
            const v = value(row, COL[key]);
            if (v !== null) g[key].push(v);
        }
        g.original += value(row, COL.original) || 0;
        g.compressed += value(row, COL.compressed) || 0;
    }
    const mean = a => a.length ? a.reduce((s, v) => s + v, 0) / a.length : null;
    return Array.from(groups, ([algo, g]) => ({
        algo,
        ratio: mean(g.ratio),
        comp: mean(g.comp),
        decomp: mean(g.decomp),
        overall: g.compressed > 0 ? g.original / g.compressed : null,
    })).sort((a, b) => ((b.ratio ?? -Infinity) - (a.ratio ?? -Infinity)) || byLabel(a.algo, b.algo));
}

function crossCheck(stats) {
    const byAlgo = new Map(stats.map(s => [s.algo, s]));
    const mismatched = [];
    for (const row of document.querySelectorAll('#summary tbody tr')) {
        const s = byAlgo.get(row.dataset.algo);
        const expected = row.dataset.ratio === '' ? null : Number(row.dataset.ratio);
        const same = s && (s.ratio === expected ||
            (s.ratio !== null && expected !== null && Math.abs(s.ratio - expected) < 1e-9));
        if (!same) mismatched.push(row.dataset.algo);
    }
    const out = document.getElementById('crosscheck');
    if (mismatched.length) {
        out.className = 'warning';
        out.textContent = 'Browser aggregation disagrees for: ' + mismatched.join(', ');
    } else {
        out.className = 'ok';
        out.textContent = 'Browser aggregation matches the summary table.';
    }
}

function chart(id, stats, datasets) {
    if (typeof Chart === 'undefined') return;
    new Chart(document.getElementById(id), {
        type: 'bar',
        data: {
            labels: stats.map(s => s.algo),
            datasets: datasets.map(([label, key]) => ({ label, data: stats.map(s => s[key]) })),
        },
        options: { responsive: true, plugins: { legend: { labels: { color: '#e6edf3' } } } },
    });
}

const stats = aggregate();
crossCheck(stats);
chart('ratioChart', stats, [['Average ratio', 'ratio'], ['Overall ratio', 'overall']]);
chart('speedChart', stats, [['Compression MB/s', 'comp'], ['Decompression MB/s', 'decomp']]);

document.getElementById('filter').addEventListener('input', ev => {
    const q = ev.target.value.trim().toLowerCase();
    let shown = 0;
    for (const row of rows) {
        const match = q === '' ||
            row.cells[COL.file].textContent.toLowerCase().includes(q) ||
            row.cells[COL.algo].textContent.toLowerCase().includes(q);
        row.hidden = !match;
        if (match) shown++;
    }
    document.getElementById('shown').textContent = shown;
});

runTable.tHead.addEventListener('click', ev => {
    const th = ev.target.closest('th');
    if (!th) return;
    const col = th.cellIndex;
    const numeric = th.dataset.type === 'num';
    const dir = th.dataset.dir === 'asc' ? 'desc' : 'asc';
    for (const c of runTable.tHead.rows[0].cells) delete c.dataset.dir;
    th.dataset.dir = dir;
    const key = row => numeric ? (value(row, col) ?? -Infinity) : row.cells[col].textContent.toLowerCase();
    const sorted = rows.slice().sort((a, b) => {
        const c = byLabel(key(a), key(b));
        return dir === 'asc' ? c : -c;
    });
    const body = runTable.tBodies[0];
    sorted.forEach(r => body.appendChild(r));
});
"#;

/// Escapes text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn raw(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn header_cells(html: &mut String, columns: &[(&str, bool)]) {
    html.push_str("<thead><tr>");
    for (name, numeric) in columns {
        let kind = if *numeric { "num" } else { "text" };
        let _ = write!(html, "<th data-type=\"{}\">{}</th>", kind, escape_html(name));
    }
    html.push_str("</tr></thead>\n");
}

fn run_rows(html: &mut String, runs: &[BenchmarkRun]) {
    html.push_str("<tbody>\n");
    for run in runs {
        let class = if run.verified { "" } else { " class=\"unverified\"" };
        let _ = writeln!(
            html,
            "<tr{class}><td>{file}</td><td>{algo}</td>\
             <td data-value=\"{ob}\">{okb:.2}</td><td data-value=\"{cb}\">{ckb:.2}</td>\
             <td data-value=\"{ratio_raw}\">{ratio}</td>\
             <td data-value=\"{cs}\">{cs:.4}</td><td data-value=\"{ds}\">{ds:.4}</td>\
             <td data-value=\"{cm_raw}\">{cm}</td><td data-value=\"{dm_raw}\">{dm}</td>\
             <td>{verified}</td></tr>",
            class = class,
            file = escape_html(&run.file),
            algo = escape_html(&run.algorithm),
            ob = run.original_bytes,
            okb = run.original_kb,
            cb = run.compressed_bytes,
            ckb = run.compressed_kb,
            ratio_raw = raw(run.ratio),
            ratio = fmt_opt(run.ratio, 2),
            cs = run.compress_secs,
            ds = run.decompress_secs,
            cm_raw = raw(run.compress_mbps),
            cm = fmt_opt(run.compress_mbps, 2),
            dm_raw = raw(run.decompress_mbps),
            dm = fmt_opt(run.decompress_mbps, 2),
            verified = if run.verified { "yes" } else { "NO" },
        );
    }
    html.push_str("</tbody>\n");
}

fn summary_rows(html: &mut String, summaries: &[AlgorithmSummary], totals: &[AlgorithmSummary]) {
    html.push_str("<tbody>\n");
    for s in summaries {
        let overall = totals
            .iter()
            .find(|t| t.algorithm == s.algorithm)
            .and_then(|t| t.overall_ratio);
        let _ = writeln!(
            html,
            "<tr data-algo=\"{algo}\" data-ratio=\"{ratio_raw}\"><td>{algo}</td><td>{runs}</td>\
             <td>{ratio}</td><td>{overall}</td><td>{cs:.4}</td><td>{ds:.4}</td>\
             <td>{cm}</td><td>{dm}</td><td>{tokb:.2}</td><td>{tckb:.2}</td></tr>",
            algo = escape_html(&s.algorithm),
            ratio_raw = raw(s.avg_ratio),
            runs = s.runs,
            ratio = fmt_opt(s.avg_ratio, 2),
            overall = fmt_opt(overall, 2),
            cs = s.avg_compress_secs,
            ds = s.avg_decompress_secs,
            cm = fmt_opt(s.avg_compress_mbps, 2),
            dm = fmt_opt(s.avg_decompress_mbps, 2),
            tokb = kb(s.total_original_bytes),
            tckb = kb(s.total_compressed_bytes),
        );
    }
    html.push_str("</tbody>\n");
}

/// Builds the dashboard page.
///
/// `summaries` fills the summary table in its given order; `totals` supplies
/// the overall ratio column.
pub fn render_html(
    meta: &ReportMeta,
    runs: &[BenchmarkRun],
    summaries: &[AlgorithmSummary],
    totals: &[AlgorithmSummary],
) -> String {
    let mut html = String::with_capacity(16 * 1024 + runs.len() * 400);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Compression Benchmark Report</title>\n");
    let _ = writeln!(html, "<script src=\"{}\"></script>", CHART_JS_URL);
    let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>\n<div class=\"container\">", STYLE);

    html.push_str("<header>\n<h1>Compression Benchmark Report</h1>\n");
    let mut subtitle = vec![format!("{} runs", runs.len())];
    if meta.failed_runs > 0 {
        subtitle.push(format!("{} failed", meta.failed_runs));
    }
    if !meta.corpus.is_empty() {
        subtitle.push(format!("corpus {}", meta.corpus));
    }
    if !meta.generated_at.is_empty() {
        subtitle.push(format!("generated {}", meta.generated_at));
    }
    let _ = writeln!(
        html,
        "<p class=\"subtitle\">{}</p>",
        escape_html(&subtitle.join(" \u{00b7} "))
    );
    if let Some(hw) = &meta.hardware {
        let _ = writeln!(
            html,
            "<p class=\"subtitle\">{} \u{00b7} {} cores \u{00b7} {} MB RAM \u{00b7} {}</p>",
            escape_html(&hw.cpu_brand),
            hw.cpu_cores,
            hw.total_memory_mb,
            escape_html(&hw.os)
        );
    }
    html.push_str("</header>\n");

    html.push_str("<div class=\"grid\">\n");
    html.push_str("<div class=\"panel\"><h2>Compression ratio</h2><canvas id=\"ratioChart\"></canvas></div>\n");
    html.push_str("<div class=\"panel\"><h2>Throughput (MB/s)</h2><canvas id=\"speedChart\"></canvas></div>\n");
    html.push_str("</div>\n");

    html.push_str("<div class=\"panel\">\n<h2>Per-algorithm summary</h2>\n<table id=\"summary\">\n");
    header_cells(
        &mut html,
        &[
            ("Algorithm", false),
            ("Runs", true),
            ("Avg Ratio", true),
            ("Overall Ratio", true),
            ("Avg Compression Time (s)", true),
            ("Avg Decompression Time (s)", true),
            ("Avg Compression Speed (MB/s)", true),
            ("Avg Decompression Speed (MB/s)", true),
            ("Total Original (KB)", true),
            ("Total Compressed (KB)", true),
        ],
    );
    summary_rows(&mut html, summaries, totals);
    html.push_str("</table>\n<p id=\"crosscheck\"></p>\n</div>\n");

    html.push_str("<div class=\"panel\">\n<h2>All runs</h2>\n");
    let _ = writeln!(
        html,
        "<input id=\"filter\" type=\"search\" placeholder=\"Filter by file or algorithm\"> \
         <span class=\"subtitle\"><span id=\"shown\">{}</span> shown</span>",
        runs.len()
    );
    html.push_str("<table id=\"runs\">\n");
    header_cells(
        &mut html,
        &[
            ("File", false),
            ("Algorithm", false),
            ("Original Size (KB)", true),
            ("Compressed Size (KB)", true),
            ("Compression Ratio", true),
            ("Compression Time (s)", true),
            ("Decompression Time (s)", true),
            ("Compression Speed (MB/s)", true),
            ("Decompression Speed (MB/s)", true),
            ("Verified", false),
        ],
    );
    run_rows(&mut html, runs);
    html.push_str("</table>\n</div>\n</div>\n");

    let _ = write!(html, "<script>{}</script>\n</body>\n</html>\n", SCRIPT);
    html
}
