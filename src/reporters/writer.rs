use crate::scan::models::ScanResult;
use crate::utils::fs::atomic_write;
use anyhow::Result;
use std::path::Path;

/// Save results: a JSON array for `.json` paths, one text line per result otherwise.
pub fn write_results(path: &Path, results: &[ScanResult]) -> Result<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let content = if is_json {
        render_json(results)?
    } else {
        render_text(results)
    };

    atomic_write(path, content.as_bytes())?;
    tracing::info!("Wrote {} results to {:?}", results.len(), path);
    Ok(())
}

fn render_json(results: &[ScanResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

fn render_text(results: &[ScanResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&result.to_string());
        out.push('\n');
    }
    out
}
