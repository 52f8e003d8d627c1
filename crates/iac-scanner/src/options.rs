//! 扫描选项与统计信息（模块）
use serde::Serialize;

/// 扫描选项
#[derive(Debug, Clone, Default)]
pub struct ScannerOptions {
    /// 最大文件大小（字节）；超过则跳过，视为未命中
    pub max_file_size: Option<u64>,
    /// 目录扫描线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    /// 目录递归深度：None 表示不限
    pub max_depth: Option<usize>,
}

/// 目录扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub files_matched: usize,
    pub hits_total: usize,
}
