use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iac_scanner::{PatternScanner, ScannerOptions};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

mod runner;
mod sample;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "iac-host", version, about = "反作弊检测插件参考宿主")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 注册示例插件并执行一轮检测，输出 JSON 报告
    Run {
        /// 规则文件（TOML）；给出时安装特征扫描器作为扫描桥
        #[arg(long)]
        rules: Option<PathBuf>,

        /// 示例插件经扫描桥检查的文件（可重复）
        #[arg(long)]
        watch: Vec<PathBuf>,

        /// 最大扫描文件大小（字节）
        #[arg(long)]
        max_file_size: Option<u64>,

        /// 输出文件；缺省写到标准输出
        #[arg(long)]
        output: Option<PathBuf>,

        /// 宿主要求的最低 API 版本（major * 100 + minor）
        #[arg(long, default_value_t = iac_api::API_VERSION)]
        min_api_version: i32,
    },

    /// 用特征扫描器扫描文件或目录，输出 JSON 数组
    Scan {
        /// 输入文件或目录
        #[arg(long)]
        input: PathBuf,

        /// 规则文件（TOML）
        #[arg(long)]
        rules: PathBuf,

        /// 输出文件（JSON 数组）
        #[arg(long, default_value = "./scan.json")]
        output: PathBuf,

        /// 线程数（"auto"=CPU 核心数）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 最大扫描文件大小（字节）
        #[arg(long)]
        max_file_size: Option<u64>,

        /// 目录递归深度
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// 打印插件 API 版本
    ApiVersion,
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { rules, watch, max_file_size, output, min_api_version } => {
            // 先做版本探测，再调用其余接口
            iac_api::ensure_compatible(min_api_version).context("plugin api version check")?;

            if let Some(rules) = rules {
                let opts = ScannerOptions { max_file_size, ..Default::default() };
                let scanner = PatternScanner::from_rules_file(&rules, opts).context("load scanner rules")?;
                info!(?rules, rules_loaded = scanner.rule_count(), "installing scan bridge");
                iac_api::init_scan_bridge(Some(scanner.into_scan_fn()));
            } else if !watch.is_empty() {
                warn!("no rules given, watched files will never match");
            }

            sample::register(&watch);

            let detections = iac_api::get_all_detections();
            info!(detections = detections.len(), "running detections");
            let report = runner::run_detections(&detections);

            match output {
                Some(path) => {
                    let mut out = BufWriter::new(File::create(&path).context("create output file")?);
                    serde_json::to_writer_pretty(&mut out, &report).context("write report")?;
                    out.flush().context("flush report")?;
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    serde_json::to_writer_pretty(&mut out, &report).context("write report")?;
                    writeln!(out)?;
                }
            }

            let detected = report.outcomes.iter().filter(|o| o.detected).count();
            let failed = report.outcomes.iter().filter(|o| o.failed).count();
            let action = report.highest.map(|s| s.action()).unwrap_or("none");
            info!(detected, failed, action, "detection run finished");
        }
        Commands::Scan { input, rules, output, threads, max_file_size, max_depth } => {
            info!(?input, ?output, "starting scan");

            let opts = ScannerOptions { max_file_size, threads: parse_threads(&threads), max_depth };
            let scanner = PatternScanner::from_rules_file(&rules, opts).context("load scanner rules")?;
            let (reports, stats) = scanner.sweep(&input).context("scan failed")?;

            let mut out = BufWriter::new(File::create(&output).context("create output file")?);
            serde_json::to_writer(&mut out, &reports).context("write results")?;
            out.flush().context("flush results")?;

            info!(
                files_scanned = stats.files_scanned,
                files_skipped = stats.files_skipped,
                files_matched = stats.files_matched,
                hits_total = stats.hits_total,
                "scan finished"
            );
        }
        Commands::ApiVersion => {
            let v = iac_api::get_api_version();
            println!("{} ({}.{})", v, iac_api::API_VERSION_MAJOR, iac_api::API_VERSION_MINOR);
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    // 日志写到 stderr，避免污染标准输出上的报告
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
