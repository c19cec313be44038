//! Wi-Fi Host Driver 顶层整合
//!
//! 把三个成员 crate 收拢成平台可直接取用的一套：
//! - chip: 总线/RTOS 移植接口、芯片电源互锁（KSO / HT 时钟）、DS1 退出
//! - pkt: 包缓冲与缓冲池能力
//! - whd: 控制消息编解码、命令通道、事件分发、STA 接入状态机、扫描引擎
//!
//! 平台职责：实现 `chip::BusOps` 与 `chip::Rtos`，完成上电与固件下载，
//! 把总线 RX 路径接到 `WhdDriver::process_control_response` /
//! `WhdDriver::process_event_frame`，然后经 `wifi_host_init` 拿驱动句柄。

#![no_std]

extern crate alloc;

pub use chip;
pub use pkt;
pub use whd;

use alloc::boxed::Box;
use alloc::sync::Arc;

/// 无线驱动上下文：驱动句柄 + 主接口
pub struct WifiHost {
    pub driver: Arc<whd::WhdDriver>,
    pub primary: Arc<whd::WhdInterface>,
}

/// 创建驱动并完成芯片侧就绪（save/restore 探测、主接口、固件能力）。
///
/// 调用前平台需已上电并完成固件/CLM 下载；`chip_id` 来自总线枚举。
pub fn wifi_host_init(
    bus: Arc<dyn chip::BusOps>,
    pool: Box<dyn pkt::BufferPool>,
    rtos: Arc<dyn chip::Rtos>,
    chip_id: u16,
) -> whd::WhdResult<WifiHost> {
    log::info!(target: "wifi_host", "wifi_host_init: chip 0x{:x}", chip_id);
    let driver = whd::WhdDriver::init(bus, pool, rtos, chip_id);
    let primary = driver.wifi_on()?;
    Ok(WifiHost { driver, primary })
}

impl WifiHost {
    /// 拉起 WLAN 并返回可用的 STA 接口
    pub fn up(&self) -> whd::WhdResult<&Arc<whd::WhdInterface>> {
        self.primary.set_up()?;
        Ok(&self.primary)
    }

    /// 关停并拆除；要求已 `wifi_off`
    pub fn shutdown(&self) -> whd::WhdResult<()> {
        if self.driver.wlan_state() == whd::WlanState::Up {
            self.primary.set_down()?;
        }
        self.driver.wifi_off()?;
        self.driver.deinit()
    }
}
