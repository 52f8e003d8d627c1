//! 进程级上下文：注册表 + 扫描桥
//!
//! 插件与宿主各自独立编译，均通过 `PluginContext::global()` 访问同一实例；
//! 测试或嵌入式宿主可用 `PluginContext::new()` 构造隔离实例。
use std::sync::{Arc, OnceLock};

use crate::bridge::{ScanBridge, ScanFn};
use crate::detection::DetectionEntry;
use crate::registry::DetectionRegistry;
use crate::severity::Severity;

#[derive(Debug, Default)]
pub struct PluginContext {
    registry: DetectionRegistry,
    bridge: ScanBridge,
}

static GLOBAL: OnceLock<PluginContext> = OnceLock::new();

impl PluginContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程内唯一实例（惰性创建）
    pub fn global() -> &'static PluginContext {
        GLOBAL.get_or_init(PluginContext::new)
    }

    pub fn registry(&self) -> &DetectionRegistry {
        &self.registry
    }

    pub fn bridge(&self) -> &ScanBridge {
        &self.bridge
    }
}

// ---- 以下为面向插件/宿主的自由函数，均作用于全局上下文 ----

pub fn register_detection<F>(name: impl Into<String>, description: impl Into<String>, severity: Severity, probe: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    PluginContext::global().registry().register(name, description, severity, probe);
}

pub fn get_all_detections() -> Vec<Arc<DetectionEntry>> {
    PluginContext::global().registry().detections()
}

/// 任一检测命中即返回 true
pub fn perform_detections() -> bool {
    PluginContext::global().registry().perform()
}

pub fn init_scan_bridge(callback: Option<ScanFn>) {
    PluginContext::global().bridge().install(callback);
}

pub fn scan_file(path: &str) -> bool {
    PluginContext::global().bridge().scan_file(path)
}
