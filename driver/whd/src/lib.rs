//! Wi-Fi Host Driver 核心
//!
//! 对应 WHD 的 whd_wifi_api.c / whd_cdc_bdc.c / whd_events.c / whd_management.c：
//! host 侧经总线控制外部 Wi-Fi 芯片，向上提供 STA 接入管理面。
//!
//! 五个组件：
//! - 控制消息编解码（cdc）：IOCTL / IOVAR 帧、字节序转换
//! - 命令通道（ioctl）：独占串行下发、请求-响应配对、超时
//! - 事件分发（events）：异步固件事件按 (接口, 事件码) 路由
//! - 总线电源互锁：chip crate 的 wake 引用计数（命令与 join 全程持有）
//! - 接入状态机（join）+ 扫描引擎（scan）：scan → prepare → associate →
//!   authenticate → key-exchange → link-up
//!
//! 总线传输、缓冲池、固件下载由平台提供（chip::BusOps / pkt::BufferPool）。

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod api;
mod cdc;
mod events;
pub mod ie;
mod ioctl;
mod join;
mod management;
mod result;
mod scan;
mod types;
pub mod wire;

pub use cdc::{dtoh16, dtoh32, htod16, htod32, CdcHeader, CDC_HEADER_LEN};
pub use events::{
    EventDispatcher, EventHeader, WHD_EVENT_HEADER_LEN, WHD_EVENT_NOT_REGISTERED,
    WHD_MAX_EVENT_SUBSCRIPTION,
};
pub use ioctl::{CommandChannel, WHD_IOCTL_TIMEOUT_MS};
pub use join::{
    AuthCallback, AuthEvent, DEFAULT_EAPOL_KEY_PACKET_TIMEOUT, DEFAULT_JOIN_ATTEMPT_TIMEOUT,
};
pub use management::{IcmpEchoReqCallback, WhdDriver, WhdInterface, WHD_INTERFACE_MAX};
pub use result::{UnsupportedOk, WhdError, WhdResult};
pub use scan::{ScanCallback, ScanStatus, SyncScanResult};
pub use types::*;

#[cfg(test)]
pub(crate) mod testutil;
