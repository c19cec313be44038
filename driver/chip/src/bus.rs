//! 总线能力（对应 whd_bus_protocol_interface.h 的 whd_bus_* 函数表）
//!
//! SDIO / SPI / M2M 具体传输由平台实现；核心只经由本 trait 访问
//! 寄存器、背板与控制帧发送。

use axerrno::AxResult;

/// SDIO function 空间（对应 whd_bus_function_t）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BusFunction {
    /// F0：卡公共寄存器（CCCR）
    Bus = 0,
    /// F1：背板窗口与芯片控制寄存器
    Backplane = 1,
    /// F2：WLAN 数据
    Wlan = 2,
}

/// 背板块传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDir {
    Read,
    Write,
}

/// 总线操作（对应 whd_bus_read_register_value / whd_bus_write_backplane_value /
/// whd_bus_transfer_backplane_bytes / whd_bus_send_buffer 等）
pub trait BusOps: Send + Sync {
    fn read_register(&self, function: BusFunction, address: u32, byte_count: u8) -> AxResult<u32>;

    fn write_register(
        &self,
        function: BusFunction,
        address: u32,
        byte_count: u8,
        value: u32,
    ) -> AxResult<()>;

    fn read_backplane(&self, address: u32, byte_count: u8) -> AxResult<u32>;

    fn write_backplane(&self, address: u32, byte_count: u8, value: u32) -> AxResult<()>;

    /// 块传输：Read 填充 buffer，Write 发送 buffer 内容。
    fn transfer_backplane_bytes(&self, dir: BusDir, address: u32, buffer: &mut [u8])
        -> AxResult<()>;

    /// 发送一帧控制消息（CDC 头 + 载荷）。响应与事件由平台 RX 路径送回核心。
    fn send_buffer(&self, frame: &[u8]) -> AxResult<()>;

    /// 总线专属唤醒/睡眠（SPI 序列、SDIO 时钟门控等）
    fn wakeup(&self) -> AxResult<()>;
    fn sleep(&self) -> AxResult<()>;

    /// HT 时钟可用状态（对应 whd_bus_is_up / whd_bus_set_state）
    fn is_up(&self) -> bool;
    fn set_state(&self, up: bool);
}
