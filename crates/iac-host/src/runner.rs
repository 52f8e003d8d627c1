//! 检测调度：枚举全部检测项并逐个隔离调用
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

use iac_api::{DetectionEntry, Severity};

/// 单个探针的执行结果
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub action: &'static str,
    pub detected: bool,
    /// 探针 panic；不计入命中
    pub failed: bool,
}

/// 一轮检测的汇总（写出为 JSON）
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub api_version: i32,
    pub outcomes: Vec<ProbeOutcome>,
    /// 命中项中的最高严重级别
    pub highest: Option<Severity>,
    /// 命中项严重级别之和（供统计使用）
    pub triggered_severity_total: i32,
}

/// 按注册顺序调用每个探针；单个探针 panic 不影响其余探针
pub fn run_detections(entries: &[Arc<DetectionEntry>]) -> RunReport {
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        let (detected, failed) = match catch_unwind(AssertUnwindSafe(|| entry.run())) {
            Ok(hit) => (hit, false),
            Err(_) => {
                warn!(name = entry.name(), "probe panicked");
                (false, true)
            }
        };
        if detected {
            info!(name = entry.name(), action = entry.severity().action(), "cheat detected");
        }
        outcomes.push(ProbeOutcome {
            name: entry.name().to_string(),
            description: entry.description().to_string(),
            severity: entry.severity(),
            action: entry.severity().action(),
            detected,
            failed,
        });
    }

    let triggered = outcomes.iter().filter(|o| o.detected);
    let highest = triggered.clone().map(|o| o.severity).max();
    let triggered_severity_total = triggered.map(|o| o.severity.as_i32()).sum();

    RunReport { api_version: iac_api::get_api_version(), outcomes, highest, triggered_severity_total }
}
