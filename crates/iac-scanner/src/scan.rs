//! 扫描器主体：单文件判定（供扫描桥使用）与目录并行扫描
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use iac_api::ScanFn;

use crate::engine::{scan_file_chunked, scan_file_whole, SMALL_FILE_MAX};
use crate::findings::{sort_hits_stable, FileReport};
use crate::options::{ScanStats, ScannerOptions};
use crate::prefilter::{build_prefilter_plan, PrefilterPlan};
use crate::rules::{load_rule_specs, parse_rule_specs, RuleSpec};

/// 基于特征规则的文件扫描器（线程安全，可克隆共享）
#[derive(Clone)]
pub struct PatternScanner {
    plan: Arc<PrefilterPlan>,
    opts: ScannerOptions,
}

impl PatternScanner {
    pub fn from_specs(specs: &[RuleSpec], opts: ScannerOptions) -> Result<Self> {
        let plan = build_prefilter_plan(specs)?;
        Ok(Self { plan: Arc::new(plan), opts })
    }

    /// 从 TOML 规则文件构建
    pub fn from_rules_file(path: &Path, opts: ScannerOptions) -> Result<Self> {
        let specs = load_rule_specs(path)?;
        Self::from_specs(&specs, opts)
    }

    pub fn from_toml_str(txt: &str, opts: ScannerOptions) -> Result<Self> {
        let specs = parse_rule_specs(txt)?;
        Self::from_specs(&specs, opts)
    }

    /// 已编译（有效）的规则数
    pub fn rule_count(&self) -> usize {
        self.plan.rules.len()
    }

    /// 扫描单个文件；超出大小限制的文件标记为 skipped
    pub fn scan_path(&self, path: &Path) -> Result<FileReport> {
        let md = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if let Some(max) = self.opts.max_file_size {
            if md.len() > max { return Ok(FileReport::skipped(path.to_path_buf())); }
        }
        // 小文件整读，超大文件分块
        let mut hits = if md.len() <= SMALL_FILE_MAX {
            scan_file_whole(path, &self.plan)
        } else {
            scan_file_chunked(path, &self.plan)
        }
        .with_context(|| format!("scan {}", path.display()))?;
        sort_hits_stable(&mut hits);
        Ok(FileReport { path: path.to_path_buf(), hits, skipped: false })
    }

    /// 单文件命中判定；任何错误都视为未命中
    pub fn is_match(&self, path: &str) -> bool {
        match self.scan_path(Path::new(path)) {
            Ok(report) => report.is_match(),
            Err(err) => {
                debug!(%path, error = %err, "scan failed, reporting no match");
                false
            }
        }
    }

    /// 包装为扫描桥回调
    pub fn into_scan_fn(self) -> ScanFn {
        Arc::new(move |path: &str| self.is_match(path))
    }

    /// 扫描文件或目录；结果按路径排序，保证输出可复现
    pub fn sweep(&self, input: &Path) -> Result<(Vec<FileReport>, ScanStats)> {
        let files = collect_files(input, self.opts.max_depth)?;

        let threads = self.opts.threads.unwrap_or_else(num_cpus::get);
        let reports: Vec<FileReport> = if threads > 1 {
            use rayon::prelude::*;
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().context("build rayon pool")?;
            pool.install(|| files.par_iter().map(|p| self.scan_or_skip(p)).collect())
        } else {
            files.iter().map(|p| self.scan_or_skip(p)).collect()
        };

        let mut stats = ScanStats::default();
        for r in &reports {
            if r.skipped { stats.files_skipped += 1; continue; }
            stats.files_scanned += 1;
            if r.is_match() { stats.files_matched += 1; }
            stats.hits_total += r.hits.len();
        }
        Ok((reports, stats))
    }

    fn scan_or_skip(&self, path: &Path) -> FileReport {
        self.scan_path(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            FileReport::skipped(path.to_path_buf())
        })
    }
}

impl std::fmt::Debug for PatternScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternScanner").field("rules", &self.rule_count()).field("opts", &self.opts).finish()
    }
}

/// 收集待扫描文件（input 为文件时直接返回），按路径排序
fn collect_files(input: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    let md = std::fs::metadata(input).with_context(|| format!("stat {}", input.display()))?;
    if md.is_file() { return Ok(vec![input.to_path_buf()]); }

    let mut walker = WalkDir::new(input).min_depth(1);
    if let Some(d) = max_depth { walker = walker.max_depth(d); }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in walker {
        let entry = match entry { Ok(e) => e, Err(_) => continue };
        if entry.file_type().is_file() { files.push(entry.into_path()); }
    }
    files.sort();
    Ok(files)
}
