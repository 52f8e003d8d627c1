//! 检测注册表：进程内有序、仅追加
//!
//! - 插入顺序即枚举顺序，不按严重级别或名称重排。
//! - 不提供更新/删除；条目随注册表存活到进程退出。
//! - 约定在模块加载期单线程注册、之后多线程读取；内部仍以读写锁保护，
//!   注册与枚举并发时枚举得到的是调用时刻的快照。
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::detection::{DetectionEntry, Probe};
use crate::severity::Severity;

#[derive(Default)]
pub struct DetectionRegistry {
    entries: RwLock<Vec<Arc<DetectionEntry>>>,
}

impl DetectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个检测项；永不失败，名称可重复
    pub fn register<F>(&self, name: impl Into<String>, description: impl Into<String>, severity: Severity, probe: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.register_probe(name, description, severity, Arc::new(probe));
    }

    /// 同 `register`，接收已共享的探针
    pub fn register_probe(&self, name: impl Into<String>, description: impl Into<String>, severity: Severity, probe: Probe) {
        let entry = DetectionEntry::new(name.into(), description.into(), severity, probe);
        debug!(name = entry.name(), severity = %entry.severity(), "detection registered");
        // 锁中毒不影响仅追加的数据，直接取回内部值
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push(Arc::new(entry));
    }

    /// 按注册顺序返回全部检测项的快照
    pub fn detections(&self) -> Vec<Arc<DetectionEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, index: usize) -> Option<Arc<DetectionEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依注册顺序调用探针，任一命中即返回 true（短路）
    /// 探针在锁外执行，探针内部可再次访问注册表
    pub fn perform(&self) -> bool {
        self.detections().iter().any(|e| e.run())
    }
}

impl std::fmt::Debug for DetectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionRegistry").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_registry_enumerates_nothing() {
        let reg = DetectionRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.detections().is_empty());
        assert!(!reg.perform());
        assert!(reg.get(0).is_none());
    }

    #[test]
    fn enumeration_preserves_registration_order() {
        let reg = DetectionRegistry::new();
        let names: Vec<String> = (0..20).map(|i| format!("probe-{i}")).collect();
        for (i, n) in names.iter().enumerate() {
            // 严重级别倒序注册，确认不会按级别重排
            reg.register(n.clone(), "ordered", Severity::clamped(2 - (i as i32 % 3)), || false);
        }
        let got: Vec<String> = reg.detections().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(got, names);
        assert_eq!(reg.len(), 20);
    }

    #[test]
    fn two_entries_sum_their_severities() {
        let reg = DetectionRegistry::new();
        reg.register("A", "checks A", Severity::Log, || false);
        reg.register("B", "checks B", Severity::Ban, || true);

        let all = reg.detections();
        assert_eq!(all.len(), 2);
        assert_eq!((all[0].name(), all[0].severity()), ("A", Severity::Log));
        assert_eq!((all[1].name(), all[1].severity()), ("B", Severity::Ban));
        assert_eq!(all[1].description(), "checks B");
        let total: i32 = all.iter().map(|e| e.severity().as_i32()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn duplicate_names_are_kept() {
        let reg = DetectionRegistry::new();
        reg.register("same", "first", Severity::Log, || false);
        reg.register("same", "second", Severity::Kick, || true);
        let all = reg.detections();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].description(), "first");
        assert_eq!(all[1].description(), "second");
    }

    #[test]
    fn perform_short_circuits_on_first_hit() {
        let reg = DetectionRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for hit in [false, true, false] {
            let c = Arc::clone(&calls);
            reg.register("p", "", Severity::Log, move || {
                c.fetch_add(1, Ordering::SeqCst);
                hit
            });
        }
        assert!(reg.perform());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_registrations() {
        let reg = DetectionRegistry::new();
        reg.register("first", "", Severity::Log, || false);
        let snap = reg.detections();
        reg.register("second", "", Severity::Log, || false);
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn concurrent_registration_loses_nothing() {
        let reg = Arc::new(DetectionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        reg.register(format!("t{t}-{i}"), "", Severity::Log, || false);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 400);
    }
}
