//! 命中项与排序
use serde::Serialize;
use std::path::PathBuf;

/// 单条规则在文件中的命中（每条规则只保留首个偏移）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    pub rule_id: String,
    pub offset: usize,
}

/// 单个文件的扫描结果
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub hits: Vec<Hit>,
    /// 因大小限制或读取失败而未扫描
    pub skipped: bool,
}

impl FileReport {
    pub(crate) fn skipped(path: PathBuf) -> Self {
        Self { path, hits: Vec::new(), skipped: true }
    }

    pub fn is_match(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// 稳定排序：偏移升序 → 规则 id 字典序升序
pub(crate) fn sort_hits_stable(hits: &mut [Hit]) {
    hits.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.rule_id.cmp(&b.rule_id)));
}
