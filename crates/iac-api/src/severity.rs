//! 严重级别（封闭枚举）
use serde::Serialize;

use crate::error::ApiError;

/// 检测命中后宿主应采取的处置等级
/// - Log：仅记录
/// - Kick：踢出
/// - Ban：永久封禁
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Severity {
    Log = 0,
    Kick = 1,
    Ban = 2,
}

impl Severity {
    /// 越界值夹取到合法区间：负数 → Log，大于 2 → Ban
    pub fn clamped(raw: i32) -> Self {
        match raw {
            i32::MIN..=0 => Severity::Log,
            1 => Severity::Kick,
            _ => Severity::Ban,
        }
    }

    /// 对应的宿主处置动作名
    pub fn action(self) -> &'static str {
        match self {
            Severity::Log => "log",
            Severity::Kick => "kick",
            Severity::Ban => "ban",
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Severity {
    type Error = ApiError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Severity::Log),
            1 => Ok(Severity::Kick),
            2 => Ok(Severity::Ban),
            other => Err(ApiError::InvalidSeverity(other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}
