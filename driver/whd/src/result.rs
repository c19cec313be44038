//! 结果码（对应 whd_types.h 的 whd_result_t 错误空间）

use axerrno::AxError;

/// 驱动错误（区分参数、资源、状态、协议、总线/时序五类）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WhdError {
    // 参数
    BadArg = 5,
    BadSsidLen = 6,
    InvalidKey = 7,
    // 资源
    BufferAllocFail = 10,
    MallocFailure = 11,
    /// 订阅表无空槽（注册方须先注销再重试）
    TooManySubscriptions = 12,
    NoResourcesForPmkidCache = 13,
    // 状态
    InterfaceNotUp = 20,
    NotDown = 21,
    InvalidInterface = 22,
    UnknownInterface = 23,
    InvalidJoinStatus = 24,
    Unfinished = 25,
    /// STA 尚未关联到 AP（依赖关联态的操作用）
    NotAssociated = 26,
    /// 接口角色与操作不符（STA 专属 / AP 专属操作）
    InvalidRole = 27,
    // 协议
    UnknownSecurityType = 30,
    WepNotAllowed = 31,
    Unsupported = 32,
    /// 固件答复 "unsupported"（BCME_UNSUPPORTED），可被 unsupported_ok 吸收
    WlanUnsupported = 33,
    NetworkNotFound = 34,
    NotAuthenticated = 35,
    NotKeyed = 36,
    JoinInProgress = 37,
    EapolKeyPacketM1Timeout = 38,
    EapolKeyPacketM3Timeout = 39,
    EapolKeyPacketG1Timeout = 40,
    EapolKeyFailure = 41,
    // 总线 / 时序
    IoctlFail = 50,
    IoctlTimeout = 51,
    BusUpFail = 52,
    BadTxId = 53,
    CoreInReset = 54,
    CoreClockNotEnabled = 55,
    PartialResults = 56,
    FilterNotFound = 57,
}

pub type WhdResult<T> = Result<T, WhdError>;

impl From<AxError> for WhdError {
    /// chip 层（总线/电源）错误折算：超时/坏状态视为总线未能上电，
    /// 其余归 IoctlFail。
    fn from(e: AxError) -> Self {
        match e {
            AxError::BadState => WhdError::BusUpFail,
            AxError::NoMemory => WhdError::MallocFailure,
            AxError::Unsupported => WhdError::Unsupported,
            _ => WhdError::IoctlFail,
        }
    }
}

/// 可选特性 IOVAR 的 "不支持即忽略" 包装
/// （对应 CHECK_RETURN_UNSUPPORTED_OK / CHECK_RETURN_UNSUPPORTED_CONTINUE）
pub trait UnsupportedOk {
    fn unsupported_ok(self) -> WhdResult<()>;
}

impl<T> UnsupportedOk for WhdResult<T> {
    fn unsupported_ok(self) -> WhdResult<()> {
        match self {
            Ok(_) => Ok(()),
            Err(WhdError::WlanUnsupported) | Err(WhdError::Unsupported) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_is_absorbed() {
        let r: WhdResult<u32> = Err(WhdError::WlanUnsupported);
        assert_eq!(r.unsupported_ok(), Ok(()));
        let r: WhdResult<u32> = Err(WhdError::IoctlTimeout);
        assert_eq!(r.unsupported_ok(), Err(WhdError::IoctlTimeout));
        let r: WhdResult<u32> = Ok(7);
        assert_eq!(r.unsupported_ok(), Ok(()));
    }
}
