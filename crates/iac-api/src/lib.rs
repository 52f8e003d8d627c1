//! 反作弊检测插件注册 API
//!
//! 组成（由底向上）：
//! - 检测注册表：进程内有序、仅追加的检测项集合，枚举顺序即注册顺序。
//! - 扫描桥：宿主注入的单一文件扫描回调，未安装时扫描结果恒为 false。
//! - 插件边界：Rust 侧自由函数与 `ffi` 中的 C 链接导出，附带版本号供宿主探测。
//!
//! 插件在加载期调用 `register_detection` 注册探针；宿主按自身节奏调用
//! `get_all_detections` 枚举并逐个调用探针，探针内部可通过 `scan_file`
//! 使用宿主先前经 `init_scan_bridge` 安装的扫描能力。

mod bridge;
mod context;
mod detection;
mod error;
pub mod ffi;
mod registry;
mod severity;
mod version;

pub use bridge::{ScanBridge, ScanFn};
pub use context::{get_all_detections, init_scan_bridge, perform_detections, register_detection, scan_file, PluginContext};
pub use detection::{DetectionEntry, Probe};
pub use error::ApiError;
pub use registry::DetectionRegistry;
pub use severity::Severity;
pub use version::{ensure_compatible, get_api_version, is_compatible, API_VERSION, API_VERSION_MAJOR, API_VERSION_MINOR};
