//! 检测项（注册后不可变）
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::severity::Severity;

/// 检测探针：无参，返回 true 表示检测到作弊
/// 探针所需状态由闭包自行捕获
pub type Probe = Arc<dyn Fn() -> bool + Send + Sync>;

/// 单个已注册的检测项
pub struct DetectionEntry {
    name: String,
    description: String,
    severity: Severity,
    probe: Probe,
    // 供 C 边界使用的 NUL 结尾副本；条目永不移除，指针在进程生命周期内有效
    c_name: CString,
    c_description: CString,
}

impl DetectionEntry {
    pub(crate) fn new(name: String, description: String, severity: Severity, probe: Probe) -> Self {
        let c_name = to_c_string(&name);
        let c_description = to_c_string(&description);
        Self { name, description, severity, probe, c_name, c_description }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// 共享探针句柄（宿主可自行调度调用）
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// 调用探针
    pub fn run(&self) -> bool {
        (self.probe)()
    }

    pub(crate) fn c_name(&self) -> &CStr {
        &self.c_name
    }

    pub(crate) fn c_description(&self) -> &CStr {
        &self.c_description
    }
}

impl std::fmt::Debug for DetectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// 内部 NUL 会截断 C 字符串，这里直接剔除
fn to_c_string(s: &str) -> CString {
    match CString::new(s) {
        Ok(c) => c,
        Err(e) => {
            let mut bytes = e.into_vec();
            bytes.retain(|&b| b != 0);
            CString::new(bytes).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_nul_is_stripped_for_c_copy() {
        let e = DetectionEntry::new("a\0b".into(), "desc".into(), Severity::Log, Arc::new(|| false));
        assert_eq!(e.name(), "a\0b");
        assert_eq!(e.c_name().to_bytes(), b"ab");
        assert_eq!(e.c_description().to_str().unwrap(), "desc");
    }

    #[test]
    fn run_invokes_captured_state() {
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let f = Arc::clone(&flag);
        let e = DetectionEntry::new(
            "flag".into(),
            "reads a flag".into(),
            Severity::Kick,
            Arc::new(move || f.load(std::sync::atomic::Ordering::SeqCst)),
        );
        assert!(!e.run());
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(e.run());
    }
}
