use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use crate::graph_utils::scores::ScoreTable;

/// `{dir}/{stem}_{YYYYMMDD_HHMMSS}.csv`, stamped in UTC.
pub fn versioned_export_path(dir: &Path, stem: &str) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    dir.join(format!("{}_{}.csv", stem, stamp))
}

// headers: id,label,score,raw_score,is_seed
pub fn export_scores_csv(table: &ScoreTable, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["id", "label", "score", "raw_score", "is_seed"])?;
    let fmt = |v: Option<f64>| v.map(|s| s.to_string()).unwrap_or_default();
    for row in &table.rows {
        wtr.write_record([
            row.lookup_id.clone(),
            row.label.clone(),
            fmt(row.score),
            fmt(row.raw_score),
            row.is_seed.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
