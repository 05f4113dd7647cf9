//! Static HTML rendering of an explanation
//!
//! A thin presentation layer over [`Explanation`]: a self-contained page with
//! a signed horizontal bar chart and the intercept/fidelity footer. The core
//! algorithm does not depend on anything here.

use crate::error::Result;
use crate::explanation::Explanation;
use std::fmt::Write as _;
use std::path::Path;

/// Render the explanation as a self-contained HTML document
pub fn render_html(explanation: &Explanation) -> String {
    let max_abs = explanation
        .feature_weights
        .iter()
        .map(|fw| fw.weight.abs())
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let title = match &explanation.class_label {
        Some(label) => format!("Local explanation for class {}", escape(label)),
        None => "Local explanation".to_string(),
    };

    let mut rows = String::new();
    for fw in &explanation.feature_weights {
        let pct = (fw.weight.abs() / max_abs * 100.0).round();
        let class = if fw.weight >= 0.0 { "pos" } else { "neg" };
        let _ = write!(
            rows,
            r#"<tr><td class="desc">{}</td><td class="bar"><div class="{}" style="width:{}%"></div></td><td class="val">{:+.4}</td></tr>"#,
            escape(&fw.description),
            class,
            pct,
            fw.weight
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; }}
td {{ padding: 4px 10px; }}
td.desc {{ text-align: right; white-space: nowrap; }}
td.bar {{ width: 320px; }}
td.bar div {{ height: 14px; border-radius: 2px; }}
td.bar div.pos {{ background: #2e8b57; }}
td.bar div.neg {{ background: #c0392b; }}
td.val {{ font-variant-numeric: tabular-nums; }}
footer {{ margin-top: 1.5em; color: #555; font-size: 0.9em; }}
</style>
</head>
<body>
<h2>{title}</h2>
<table>
{rows}
</table>
<footer>intercept {intercept:.4} &middot; local prediction {local:.4} &middot; fidelity (weighted R&sup2;) {score:.4}</footer>
</body>
</html>
"#,
        title = title,
        rows = rows,
        intercept = explanation.intercept,
        local = explanation.local_prediction,
        score = explanation.score,
    )
}

/// Write the HTML report to a file
pub fn save_to_file<P: AsRef<Path>>(explanation: &Explanation, path: P) -> Result<()> {
    std::fs::write(path, render_html(explanation))?;
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Explanation {
    /// Render this explanation to a static HTML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_to_file(self, path)
    }
}
