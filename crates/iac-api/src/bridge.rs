//! 扫描桥：宿主注入的单一文件扫描能力
use std::ffi::{CStr, CString};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::ffi::IacScanFn;

/// 文件扫描函数：输入文件路径，返回是否命中
pub type ScanFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// 槽位内容；经 C 边界安装时同时保留原始函数指针，
/// 以便 C 调用方的路径字节原样转发（非 UTF-8 路径不做有损转换）
#[derive(Clone)]
struct Installed {
    scan: ScanFn,
    raw: Option<IacScanFn>,
}

/// 单槽位；后写覆盖先写，None 表示清空
#[derive(Default)]
pub struct ScanBridge {
    slot: RwLock<Option<Installed>>,
}

impl ScanBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// 安装（或以 None 清空）扫描回调，静默替换旧值
    pub fn install(&self, callback: Option<ScanFn>) {
        debug!(installed = callback.is_some(), "scan bridge updated");
        self.replace(callback.map(|scan| Installed { scan, raw: None }));
    }

    /// 安装 C 扫描回调（None 清空）
    pub(crate) fn install_c(&self, callback: Option<IacScanFn>) {
        debug!(installed = callback.is_some(), "scan bridge updated from c boundary");
        self.replace(callback.map(|f| Installed {
            scan: Arc::new(move |path: &str| match CString::new(path) {
                Ok(c) => f(c.as_ptr()),
                Err(_) => false,
            }),
            raw: Some(f),
        }));
    }

    fn replace(&self, installed: Option<Installed>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = installed;
    }

    fn current(&self) -> Option<Installed> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_installed(&self) -> bool {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// 转发到当前回调；未安装时返回 false
    /// 回调在锁外执行，慢扫描不会阻塞并发的 install
    pub fn scan_file(&self, path: &str) -> bool {
        match self.current() {
            Some(installed) => (installed.scan)(path),
            None => false,
        }
    }

    /// C 调用方入口：C 回调收到原始字节；Rust 回调只能收到有损转换后的 UTF-8
    pub(crate) fn scan_c_path(&self, path: &CStr) -> bool {
        match self.current() {
            Some(Installed { raw: Some(f), .. }) => f(path.as_ptr()),
            Some(installed) => (installed.scan)(&path.to_string_lossy()),
            None => false,
        }
    }
}

impl std::fmt::Debug for ScanBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanBridge").field("installed", &self.is_installed()).finish()
    }
}
