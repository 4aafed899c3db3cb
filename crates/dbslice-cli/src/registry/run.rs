use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use dbslice_core::Dialect;
use dbslice_subset::SubsetReport;
use serde::Serialize;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub catalog: PathBuf,
    pub config: Option<PathBuf>,
    pub dialect: Dialect,
    pub run_dir: PathBuf,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub catalog: PathBuf,
    pub config: Option<PathBuf>,
    pub dialect: Dialect,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");
    let report_path = root.join("subset_report.json");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        catalog: ctx.catalog.clone(),
        config: ctx.config.clone(),
        dialect: ctx.dialect,
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        root,
        logs_path,
        report_path,
    })
}

/// Write the report into the run and, optionally, to `out_path`.
pub fn write_report(
    paths: &RunPaths,
    report: &SubsetReport,
    out_path: Option<&Path>,
) -> RegistryResult<()> {
    write_json(&paths.report_path, report)?;

    if let Some(out_path) = out_path {
        if let Some(parent) = out_path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        write_json(out_path, report)?;
    }

    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use dbslice_core::Table;
    use dbslice_subset::Subset;
    use uuid::Uuid;

    use super::*;

    fn context(run_dir: PathBuf) -> RunContext {
        RunContext {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            catalog: PathBuf::from("shop.catalog.json"),
            config: None,
            dialect: Dialect::Postgres,
            run_dir,
        }
    }

    #[test]
    fn start_run_writes_metadata_and_report() {
        let run_dir = std::env::temp_dir().join(format!("dbslice-runs-{}", Uuid::new_v4()));
        let ctx = context(run_dir.clone());

        let paths = start_run(&ctx).expect("start run");
        let dir_name = paths
            .root
            .file_name()
            .and_then(|name| name.to_str())
            .expect("run dir name");
        assert!(dir_name.ends_with(&format!("__run_{}", ctx.run_id)));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(paths.root.join("config.json")).expect("read config"),
        )
        .expect("parse config");
        assert_eq!(config["run_id"], ctx.run_id.as_str());
        assert_eq!(config["dialect"], "postgres");

        let subset = Subset::new(vec![Table::new("public", "users", ["id"])], Dialect::Postgres)
            .expect("plan subset");
        let out = run_dir.join("copies/report.json");
        write_report(&paths, &subset.report(), Some(&out)).expect("write report");
        assert!(paths.report_path.exists());
        assert!(out.exists());

        std::fs::remove_dir_all(&run_dir).expect("cleanup");
    }
}
