//! 特征码文件扫描器
//!
//! 宿主侧的参考扫描实现，可通过 `PatternScanner::into_scan_fn` 安装到扫描桥。
//!
//! 设计要点：
//! - 规则来自 TOML 文件，按“字节级”正则匹配，避免编码问题（扫描对象多为 PE/DLL）。
//! - 先用 Aho-Corasick 锚点预筛候选规则，再运行正则。
//! - 小文件整读，大文件分块（带重叠）读取。
//! - 每条规则每个文件只报告首个命中；目录扫描输出按路径排序。

mod engine;
mod findings;
mod options;
mod prefilter;
mod rules;
mod scan;

pub use findings::{FileReport, Hit};
pub use options::{ScanStats, ScannerOptions};
pub use rules::{load_rule_specs, parse_rule_specs, RuleSpec};
pub use scan::PatternScanner;
