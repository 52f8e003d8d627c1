//! C 链接边界（插件与宿主独立编译，运行期加载到同一进程）
//!
//! 约定：
//! - 所有导出函数永不失败，也不会让 panic 越过边界。
//! - 只传递基本类型与 NUL 结尾字符串；`IacDetectionInfo` 通过输出指针填充。
//! - 枚举得到的字符串指针由注册表持有，进程退出前一直有效。
use std::ffi::{c_char, c_int, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::context::PluginContext;
use crate::detection::{DetectionEntry, Probe};
use crate::severity::Severity;
use crate::version::API_VERSION;

/// 插件侧探针
pub type IacProbeFn = extern "C" fn() -> bool;
/// 宿主侧文件扫描回调
pub type IacScanFn = extern "C" fn(path: *const c_char) -> bool;

/// `iac_invoke_detection` 返回码
pub const IAC_DETECTED: c_int = 1;
pub const IAC_CLEAN: c_int = 0;
pub const IAC_NO_SUCH_DETECTION: c_int = -1;
pub const IAC_PROBE_PANICKED: c_int = -2;

/// 枚举结果（仅含基本类型与字符串字段）
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IacDetectionInfo {
    pub name: *const c_char,
    pub description: *const c_char,
    pub severity: c_int,
}

impl IacDetectionInfo {
    fn from_entry(entry: &DetectionEntry) -> Self {
        Self {
            name: entry.c_name().as_ptr(),
            description: entry.c_description().as_ptr(),
            severity: entry.severity().as_i32(),
        }
    }
}

#[no_mangle]
pub extern "C" fn iac_get_api_version() -> c_int {
    API_VERSION
}

/// 注册检测项
/// - NULL 字符串按空串处理，非 UTF-8 字节有损替换
/// - 越界严重级别夹取到 {0,1,2} 并告警
/// - NULL 探针注册为恒返回 false 的探针并告警
///
/// # Safety
/// `name`/`description` 为 NULL 或指向有效的 NUL 结尾字符串。
#[no_mangle]
pub unsafe extern "C" fn iac_register_detection(
    name: *const c_char,
    description: *const c_char,
    severity: c_int,
    probe: Option<IacProbeFn>,
) {
    let name = lossy_string(name);
    let description = lossy_string(description);

    let severity = match Severity::try_from(severity) {
        Ok(s) => s,
        Err(err) => {
            let clamped = Severity::clamped(severity);
            warn!(%name, %err, %clamped, "severity out of range, clamped");
            clamped
        }
    };

    let probe: Probe = match probe {
        Some(f) => Arc::new(move || f()),
        None => {
            warn!(%name, "null probe registered, it will always report clean");
            Arc::new(|| false)
        }
    };

    PluginContext::global().registry().register_probe(name, description, severity, probe);
}

/// 返回已注册检测项总数；`out` 非 NULL 时按注册顺序填充至多 `capacity` 项
///
/// # Safety
/// `out` 为 NULL 或指向至少 `capacity` 个可写的 `IacDetectionInfo`。
#[no_mangle]
pub unsafe extern "C" fn iac_get_all_detections(out: *mut IacDetectionInfo, capacity: usize) -> usize {
    let all = PluginContext::global().registry().detections();
    if !out.is_null() {
        for (i, entry) in all.iter().take(capacity).enumerate() {
            out.add(i).write(IacDetectionInfo::from_entry(entry));
        }
    }
    all.len()
}

/// 调用第 `index` 个检测项的探针
#[no_mangle]
pub extern "C" fn iac_invoke_detection(index: usize) -> c_int {
    let Some(entry) = PluginContext::global().registry().get(index) else {
        return IAC_NO_SUCH_DETECTION;
    };
    match catch_unwind(AssertUnwindSafe(|| entry.run())) {
        Ok(true) => IAC_DETECTED,
        Ok(false) => IAC_CLEAN,
        Err(_) => {
            warn!(name = entry.name(), "probe panicked");
            IAC_PROBE_PANICKED
        }
    }
}

/// 任一检测命中即返回 true；panic 的探针视为未命中
#[no_mangle]
pub extern "C" fn iac_perform() -> bool {
    PluginContext::global().registry().detections().iter().any(|entry| {
        catch_unwind(AssertUnwindSafe(|| entry.run())).unwrap_or_else(|_| {
            warn!(name = entry.name(), "probe panicked, treated as clean");
            false
        })
    })
}

/// 安装扫描回调；NULL 清空
#[no_mangle]
pub extern "C" fn iac_init_scan_bridge(callback: Option<IacScanFn>) {
    PluginContext::global().bridge().install_c(callback);
}

/// 经扫描桥扫描文件；NULL 路径或未安装回调时返回 false
/// 安装的是 C 回调时，路径字节原样转发
///
/// # Safety
/// `path` 为 NULL 或指向有效的 NUL 结尾字符串。
#[no_mangle]
pub unsafe extern "C" fn iac_scan_file(path: *const c_char) -> bool {
    if path.is_null() {
        return false;
    }
    let path = CStr::from_ptr(path);
    catch_unwind(AssertUnwindSafe(|| PluginContext::global().bridge().scan_c_path(path))).unwrap_or_else(|_| {
        warn!(path = %path.to_string_lossy(), "scan callback panicked");
        false
    })
}

unsafe fn lossy_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::Mutex;

    // 全局状态仅追加，测试串行执行并只断言增量
    static SERIAL: Mutex<()> = Mutex::new(());

    extern "C" fn detects() -> bool {
        true
    }

    extern "C" fn clean() -> bool {
        false
    }

    extern "C" fn ends_with_dll(path: *const c_char) -> bool {
        unsafe { CStr::from_ptr(path) }.to_bytes().ends_with(b".dll")
    }

    extern "C" fn never_matches(_: *const c_char) -> bool {
        false
    }

    static SEEN_PATH: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    extern "C" fn record_path(path: *const c_char) -> bool {
        let bytes = unsafe { CStr::from_ptr(path) }.to_bytes().to_vec();
        *SEEN_PATH.lock().unwrap() = bytes;
        true
    }

    fn serial() -> std::sync::MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn snapshot() -> Vec<IacDetectionInfo> {
        unsafe {
            let n = iac_get_all_detections(ptr::null_mut(), 0);
            let mut buf = vec![IacDetectionInfo { name: ptr::null(), description: ptr::null(), severity: -1 }; n];
            let total = iac_get_all_detections(buf.as_mut_ptr(), buf.len());
            assert!(total >= n);
            buf
        }
    }

    fn text(p: *const c_char) -> String {
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn version_is_stable() {
        assert_eq!(iac_get_api_version(), 100);
        assert_eq!(iac_get_api_version(), iac_get_api_version());
    }

    #[test]
    fn registration_appends_in_order() {
        let _g = serial();
        let before = snapshot().len();
        unsafe {
            iac_register_detection(c"ffi-A".as_ptr(), c"checks A".as_ptr(), 0, Some(clean));
            iac_register_detection(c"ffi-B".as_ptr(), c"checks B".as_ptr(), 2, Some(detects));
        }
        let all = snapshot();
        assert_eq!(all.len(), before + 2);
        let a = all[before];
        let b = all[before + 1];
        assert_eq!(text(a.name), "ffi-A");
        assert_eq!(text(a.description), "checks A");
        assert_eq!(text(b.name), "ffi-B");
        assert_eq!(a.severity + b.severity, 2);

        assert_eq!(iac_invoke_detection(before), IAC_CLEAN);
        assert_eq!(iac_invoke_detection(before + 1), IAC_DETECTED);
        assert_eq!(iac_invoke_detection(usize::MAX), IAC_NO_SUCH_DETECTION);
        assert!(iac_perform());
    }

    #[test]
    fn capacity_limits_what_is_written() {
        let _g = serial();
        unsafe {
            iac_register_detection(c"cap-1".as_ptr(), c"".as_ptr(), 1, Some(clean));
            iac_register_detection(c"cap-2".as_ptr(), c"".as_ptr(), 1, Some(clean));
            let mut one = [IacDetectionInfo { name: ptr::null(), description: ptr::null(), severity: -1 }; 1];
            let total = iac_get_all_detections(one.as_mut_ptr(), 1);
            assert!(total >= 2);
            assert!(!one[0].name.is_null());
        }
    }

    #[test]
    fn invalid_inputs_are_tolerated() {
        let _g = serial();
        let before = snapshot().len();
        unsafe {
            iac_register_detection(ptr::null(), ptr::null(), 7, None);
            iac_register_detection(c"neg".as_ptr(), ptr::null(), -3, Some(clean));
        }
        let all = snapshot();
        assert_eq!(all.len(), before + 2);
        assert_eq!(text(all[before].name), "");
        assert_eq!(all[before].severity, 2);
        assert_eq!(all[before + 1].severity, 0);
        assert_eq!(iac_invoke_detection(before), IAC_CLEAN);
    }

    #[test]
    fn panicking_probe_is_contained() {
        let _g = serial();
        let idx = snapshot().len();
        PluginContext::global().registry().register("boom", "panics", Severity::Log, || panic!("probe failure"));
        assert_eq!(iac_invoke_detection(idx), IAC_PROBE_PANICKED);
    }

    #[test]
    fn scan_bridge_round_trip() {
        let _g = serial();
        iac_init_scan_bridge(None);
        unsafe {
            assert!(!iac_scan_file(c"C:/game.exe".as_ptr()));
            assert!(!iac_scan_file(ptr::null()));

            iac_init_scan_bridge(Some(ends_with_dll));
            assert!(iac_scan_file(c"x.dll".as_ptr()));
            assert!(!iac_scan_file(c"x.exe".as_ptr()));

            iac_init_scan_bridge(Some(never_matches));
            assert!(!iac_scan_file(c"x.dll".as_ptr()));

            iac_init_scan_bridge(None);
            assert!(!iac_scan_file(c"x.dll".as_ptr()));
        }
    }

    #[test]
    fn non_utf8_path_reaches_c_scanner_unchanged() {
        let _g = serial();
        // GBK 编码的 "C:/游戏.exe"
        let sent: &[u8] = &[0x43, 0x3a, 0x2f, 0xd3, 0xce, 0xcf, 0xb7, 0x2e, 0x65, 0x78, 0x65];
        let path = std::ffi::CString::new(sent).unwrap();
        iac_init_scan_bridge(Some(record_path));
        assert!(unsafe { iac_scan_file(path.as_ptr()) });
        assert_eq!(SEEN_PATH.lock().unwrap().as_slice(), sent);
        iac_init_scan_bridge(None);
    }

    #[test]
    fn rust_scanner_sees_lossy_path_from_c_callers() {
        let _g = serial();
        let path = std::ffi::CString::new(vec![b'a', 0xff, b'.', b'd', b'l', b'l']).unwrap();
        PluginContext::global().bridge().install(Some(Arc::new(|p: &str| p == "a\u{fffd}.dll")));
        assert!(unsafe { iac_scan_file(path.as_ptr()) });
        iac_init_scan_bridge(None);
    }
}
