//! 错误类型（仅用于严格转换与版本校验；注册/扫描接口本身永不失败）
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 严重级别不在 {0,1,2} 内
    #[error("invalid severity {0}, expected 0 (log), 1 (kick) or 2 (ban)")]
    InvalidSeverity(i32),

    /// 宿主要求的 API 版本与插件不兼容
    #[error("incompatible api version: host requires {required}, plugin provides {provided}")]
    IncompatibleVersion { required: i32, provided: i32 },
}
