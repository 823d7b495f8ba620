//! policy-runner: train the behavior-cloning model and compile policy tables.
//!
//! Usage:
//!   policy-runner train    --config config.json
//!   policy-runner export   --config config.json [--model P] [--meta P] [--out P]
//!                          [--batch-size N] [--dedupe first|median|mean|none] [--db P]
//!                          [--stages 0,1,..] [--months ..] [--norm-days ..]
//!                          [--def-bins ..] [--canal-bins ..] [--pool-ratios ..]
//!   policy-runner diagnose --config config.json
//!   policy-runner merge    --out merged.csv --source rule=data/rule/rule_ep*.csv
//!                          [--source agent=data/agent/agent_ep*.csv ...]

use anyhow::{bail, Context, Result};
use irrigation_core::{
    compiler::PolicyCompiler,
    config::{DedupeMode, ExportConfig, PipelineConfig},
    csv::write_csv,
    dataset::list_episode_files,
    diagnostics::scan,
    forest::ForestRegressor,
    merge::merge_sources,
    meta::PolicyMeta,
    store::PolicyStore,
    trainer::train,
};
use std::{env, path::Path, str::FromStr};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        bail!("usage: policy-runner <train|export|diagnose|merge> [flags]");
    };

    match command.as_str() {
        "train"    => run_train(&args),
        "export"   => run_export(&args),
        "diagnose" => run_diagnose(&args),
        "merge"    => run_merge(&args),
        other      => bail!("unknown command '{other}'"),
    }
}

fn load_config(args: &[String]) -> Result<PipelineConfig> {
    match flag_value(args, "--config") {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("loading {path}")),
        None => {
            log::warn!("no --config given; using built-in defaults");
            Ok(PipelineConfig::from_json_str("{}")?)
        }
    }
}

fn run_train(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let arts = train(&config)?;

    println!("=== Training complete ===");
    println!("Rows: {}  Files: {}", arts.n_rows, arts.n_files);
    println!("Train MAE: {}", serde_json::to_string(&arts.train_mae)?);
    println!(" Val  MAE: {}", serde_json::to_string(&arts.val_mae)?);
    println!("Saved model -> {}", arts.model_path);
    println!("Saved meta  -> {}", arts.meta_path);
    Ok(())
}

fn run_export(args: &[String]) -> Result<()> {
    let mut config = load_config(args)?;

    // Grid overrides.
    let grid = &mut config.grid;
    if let Some(v) = parse_list(args, "--stages")?      { grid.stages = v; }
    if let Some(v) = parse_list(args, "--months")?      { grid.months = v; }
    if let Some(v) = parse_list(args, "--norm-days")?   { grid.norm_days = v; }
    if let Some(v) = parse_list(args, "--def-bins")?    { grid.def_bins = v; }
    if let Some(v) = parse_list(args, "--canal-bins")?  { grid.canal_bins = v; }
    if let Some(v) = parse_list(args, "--pool-ratios")? { grid.pool_ratios = v; }

    let model_path = flag_value(args, "--model").unwrap_or(config.model_path.as_str()).to_string();
    let meta_path = flag_value(args, "--meta").unwrap_or(config.meta_path.as_str()).to_string();
    let out_path = flag_value(args, "--out").unwrap_or(config.policy_table_path.as_str()).to_string();
    let batch_size = parse_arg(args, "--batch-size", config.export.batch_size);
    let dedupe = match flag_value(args, "--dedupe") {
        Some(mode) => DedupeMode::from_str(mode)?,
        None => config.export.dedupe,
    };
    let db = flag_value(args, "--db")
        .map(str::to_string)
        .or_else(|| config.store_path.clone());

    let model = ForestRegressor::load(Path::new(&model_path))
        .with_context(|| format!("loading model {model_path}"))?;
    let meta = PolicyMeta::load(Path::new(&meta_path))?;

    let compiled = PolicyCompiler::new(&model, &meta, &config.grid)
        .with_export(ExportConfig { batch_size, dedupe })
        .compile()?;
    compiled.table.write_csv(Path::new(&out_path))?;

    println!("[ok] Wrote policy table with {} rows -> {out_path}", compiled.table.len());
    println!("Stage domain in CSV: {:?}", compiled.table.stage_domain());

    if let Some(db) = db {
        let store = PolicyStore::open(&db)?;
        store.migrate()?;
        let run_id = store.save_compiled(&compiled, dedupe)?;
        println!("Stored as run {run_id} in {db}");
    }
    Ok(())
}

fn run_diagnose(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let files = list_episode_files(&config.data_glob)?;
    let reports = scan(&files, &config.features, &config.actions);

    for r in &reports {
        println!("{}  {}", r.file.display(), r.issues.join(";"));
    }
    let flagged = reports.iter().filter(|r| !r.is_clean()).count();
    println!("\nFiles with issues: {flagged} / {}", reports.len());
    Ok(())
}

fn run_merge(args: &[String]) -> Result<()> {
    let Some(out) = flag_value(args, "--out") else {
        bail!("merge requires --out PATH");
    };
    let mut groups = Vec::new();
    for source in flag_values(args, "--source") {
        let Some((label, pattern)) = source.split_once('=') else {
            bail!("--source expects label=pattern, got '{source}'");
        };
        groups.push((label.to_string(), list_episode_files(pattern)?));
    }
    if groups.is_empty() {
        bail!("merge requires at least one --source label=pattern");
    }

    let merged = merge_sources(&groups)?;
    write_csv(Path::new(out), &merged)?;
    println!("Saved merged dataset ({} rows) -> {out}", merged.n_rows());
    Ok(())
}

// ── Flag helpers ─────────────────────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

fn parse_arg<T: FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Comma-separated list flag, e.g. `--months 1,2,3`.
fn parse_list<T: FromStr>(args: &[String], flag: &str) -> Result<Option<Vec<T>>> {
    let Some(raw) = flag_value(args, flag) else {
        return Ok(None);
    };
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<T>()
                .map_err(|_| anyhow::anyhow!("{flag}: cannot parse '{s}'"))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
