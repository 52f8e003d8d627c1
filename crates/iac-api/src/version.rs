//! API 版本约定：major * 100 + minor（1.0 → 100）
use crate::error::ApiError;

pub const API_VERSION_MAJOR: i32 = 1;
pub const API_VERSION_MINOR: i32 = 0;
pub const API_VERSION: i32 = API_VERSION_MAJOR * 100 + API_VERSION_MINOR;

/// 当前构建的 API 版本（常量）
pub fn get_api_version() -> i32 {
    API_VERSION
}

/// 主版本一致且次版本不低于要求即视为兼容
pub fn is_compatible(required: i32) -> bool {
    required / 100 == API_VERSION_MAJOR && required % 100 <= API_VERSION_MINOR
}

/// 宿主在调用其余接口前做特性探测
pub fn ensure_compatible(required: i32) -> Result<(), ApiError> {
    if is_compatible(required) {
        Ok(())
    } else {
        Err(ApiError::IncompatibleVersion { required, provided: API_VERSION })
    }
}
