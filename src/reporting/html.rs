// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTML Report Generation
 * Self-contained report with aggregate tiles and a client-side text filter
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use crate::reporting::json::count_by_status;
use crate::scanner::ScanResult;

/// Writes a standalone HTML report for the collected findings.
pub fn generate_html(results: &[ScanResult], path: &Path) -> Result<()> {
    let counts = count_by_status(results);

    let mut rows = String::new();
    for result in results {
        let status_class = match result.status_code {
            200..=299 => "status-200",
            300..=399 => "status-300",
            400..=499 => "status-400",
            _ => "status-500",
        };

        let mut badges = String::new();
        if result.critical {
            badges.push_str(r#"<span class="badge badge-critical">CRITICAL</span>"#);
        }
        if result.secret_found {
            badges.push_str(&format!(
                r#"<span class="badge badge-secret">SECRET: {}</span>"#,
                escape_html(&result.secret_types.join(", "))
            ));
        }
        if !result.waf_detected.is_empty() {
            badges.push_str(&format!(
                r#"<span class="badge badge-waf">WAF: {}</span>"#,
                escape_html(&result.waf_detected)
            ));
        }
        if !result.technologies.is_empty() {
            badges.push_str(&format!(
                r#"<span class="badge badge-tech">{}</span>"#,
                escape_html(&result.technologies.join(", "))
            ));
        }

        let mut details = badges;
        if !result.server.is_empty() || !result.powered_by.is_empty() {
            let mut tech = Vec::new();
            if !result.server.is_empty() {
                tech.push(result.server.as_str());
            }
            if !result.powered_by.is_empty() {
                tech.push(result.powered_by.as_str());
            }
            if !details.is_empty() {
                details.push(' ');
            }
            details.push_str(&format!("<code>{}</code>", escape_html(&tech.join(", "))));
        }

        rows.push_str(&format!(
            r#"
				<tr>
					<td class="{}">{}</td>
					<td><code>{}</code></td>
					<td>{} bytes</td>
					<td>{}</td>
				</tr>"#,
            status_class,
            result.status_code,
            escape_html(&result.url),
            result.size,
            details
        ));
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>Capsaicin Scan Report</title>
	<style>
		* {{ margin: 0; padding: 0; box-sizing: border-box; }}
		body {{
			font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
			background: #f5f5f5;
			padding: 20px;
			color: #333;
		}}
		.container {{ max-width: 1400px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
		h1 {{ font-size: 24px; margin-bottom: 10px; color: #222; }}
		.meta {{ color: #666; font-size: 14px; margin-bottom: 30px; }}
		.stats {{
			display: grid;
			grid-template-columns: repeat(auto-fit, minmax(150px, 1fr));
			gap: 15px;
			margin-bottom: 30px;
		}}
		.stat-card {{ background: #f9f9f9; padding: 15px; border-radius: 6px; border-left: 3px solid #007bff; }}
		.stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
		.stat-label {{ font-size: 12px; color: #666; margin-top: 5px; }}
		.search-box {{ margin-bottom: 20px; }}
		#searchInput {{
			width: 100%;
			padding: 12px;
			font-size: 14px;
			border: 1px solid #ddd;
			border-radius: 6px;
		}}
		table {{ width: 100%; border-collapse: collapse; font-size: 14px; }}
		th {{ background: #f0f0f0; padding: 12px; text-align: left; font-weight: 600; border-bottom: 2px solid #ddd; }}
		td {{ padding: 10px 12px; border-bottom: 1px solid #eee; }}
		tr:hover {{ background: #f9f9f9; }}
		.status-200 {{ color: #28a745; font-weight: 600; }}
		.status-300 {{ color: #007bff; font-weight: 600; }}
		.status-400 {{ color: #dc3545; font-weight: 600; }}
		.status-500 {{ color: #ffc107; font-weight: 600; }}
		.badge {{
			display: inline-block;
			padding: 3px 8px;
			border-radius: 4px;
			font-size: 11px;
			font-weight: 600;
			margin-left: 5px;
		}}
		.badge-critical {{ background: #dc3545; color: white; }}
		.badge-secret {{ background: #ffc107; color: #333; }}
		.badge-waf {{ background: #6f42c1; color: white; }}
		.badge-tech {{ background: #17a2b8; color: white; }}
		code {{ background: #f4f4f4; padding: 2px 6px; border-radius: 3px; font-family: monospace; font-size: 13px; }}
	</style>
</head>
<body>
	<div class="container">
		<h1>Capsaicin Scan Report</h1>
		<div class="meta">Generated: {generated}</div>

		<div class="stats">
			<div class="stat-card">
				<div class="stat-value">{total}</div>
				<div class="stat-label">Total Findings</div>
			</div>
			<div class="stat-card">
				<div class="stat-value">{two_xx}</div>
				<div class="stat-label">Success (2xx)</div>
			</div>
			<div class="stat-card">
				<div class="stat-value">{three_xx}</div>
				<div class="stat-label">Redirects (3xx)</div>
			</div>
			<div class="stat-card">
				<div class="stat-value">{critical}</div>
				<div class="stat-label">Critical</div>
			</div>
			<div class="stat-card">
				<div class="stat-value">{secrets}</div>
				<div class="stat-label">Secrets</div>
			</div>
			<div class="stat-card">
				<div class="stat-value">{waf}</div>
				<div class="stat-label">WAF Detected</div>
			</div>
		</div>

		<div class="search-box">
			<input type="text" id="searchInput" placeholder="Search findings...">
		</div>

		<table id="resultsTable">
			<thead>
				<tr>
					<th>Status</th>
					<th>URL</th>
					<th>Size</th>
					<th>Details</th>
				</tr>
			</thead>
			<tbody>
				{rows}
			</tbody>
		</table>
	</div>

	<script>
		document.getElementById('searchInput').addEventListener('input', function(e) {{
			const searchTerm = e.target.value.toLowerCase();
			const rows = document.querySelectorAll('#resultsTable tbody tr');

			rows.forEach(row => {{
				const text = row.textContent.toLowerCase();
				row.style.display = text.includes(searchTerm) ? '' : 'none';
			}});
		}});
	</script>
</body>
</html>"#,
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S"),
        total = results.len(),
        two_xx = counts.two_xx,
        three_xx = counts.three_xx,
        critical = counts.critical,
        secrets = counts.secrets,
        waf = counts.waf,
        rows = rows,
    );

    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
