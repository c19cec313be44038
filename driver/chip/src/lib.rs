//! WLAN 芯片低层控制
//!
//! 对应 WHD 的 whd_chip.c / whd_chip_reg.h 与移植层头（whd_bus_protocol_interface.h、
//! cyabs_rtos seam）：
//! - 总线能力 `BusOps`、RTOS 能力 `Rtos`/`Semaphore`（由平台实现）
//! - SDIO 背板寄存器与位定义
//! - 芯片家族常量表（chanspec 位、唤醒方式、PMU min-res-mask）
//! - 总线电源互锁：wake 引用计数 + KSO / HT 时钟握手
//! - DS1 深睡退出子状态机、固件控制台读取
//!
//! 上电、固件下载、CLM/NVRAM 加载在平台引导期完成，不在本 crate 范围内。

#![no_std]

extern crate alloc;

mod bus;
mod console;
mod ds1;
mod family;
mod power;
mod regs;
mod rtos;

pub use bus::{BusDir, BusFunction, BusOps};
pub use console::ConsoleCursor;
pub use family::{chip_const, ChipConst, WakeStyle};
pub use power::WlanChip;
pub use regs::*;
pub use rtos::{Rtos, Semaphore, NEVER_TIMEOUT};

/// 固件能力位（`cap` IOVAR 解析结果，按位或进 fwcap 集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FwCap {
    Sae = 0,
    SaeExt = 1,
    Fbt = 2,
    Mfp = 3,
    Offloads = 4,
    GcmpConfig = 5,
}
