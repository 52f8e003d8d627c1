//! 随附示例插件：加载期注册检测项
use std::path::PathBuf;

use iac_api::Severity;

/// 注册示例检测项
/// - `test`：恒命中，仅记录
/// - `signature-scan`：经扫描桥检查被监视的文件（仅在给出监视路径时注册）
pub fn register(watch: &[PathBuf]) {
    iac_api::register_detection("test", "test description", Severity::Log, sample_detect);

    if !watch.is_empty() {
        let paths: Vec<String> = watch.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        iac_api::register_detection(
            "signature-scan",
            "scans watched files for known cheat signatures",
            Severity::Kick,
            move || paths.iter().any(|p| iac_api::scan_file(p)),
        );
    }
}

fn sample_detect() -> bool {
    true // detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn registers_probes_that_use_the_bridge() {
        let before = iac_api::get_all_detections().len();
        register(&[PathBuf::from("watched.dll")]);

        let all = iac_api::get_all_detections();
        assert_eq!(all.len(), before + 2);
        assert_eq!(all[before].name(), "test");
        assert!(all[before].run());

        let scan = &all[before + 1];
        assert_eq!(scan.severity(), Severity::Kick);
        iac_api::init_scan_bridge(None);
        assert!(!scan.run());
        iac_api::init_scan_bridge(Some(Arc::new(|p: &str| p.ends_with(".dll"))));
        assert!(scan.run());
        iac_api::init_scan_bridge(None);
    }
}
