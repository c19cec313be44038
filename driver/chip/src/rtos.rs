//! RTOS 移植接口（对应 cyabs_rtos 的 cy_rtos_* 子集）
//!
//! 核心只使用三件事：计数信号量、毫秒延时、毫秒时基。调度器本身
//! （抢占式线程、驱动工作线程的创建）由平台持有，核心不生线程。

use alloc::sync::Arc;

/// 永不超时（对应 CY_RTOS_NEVER_TIMEOUT）
pub const NEVER_TIMEOUT: u32 = u32::MAX;

/// 计数信号量（对应 cy_semaphore_t）
pub trait Semaphore: Send + Sync {
    /// 等待一个计数，最多 timeout_ms 毫秒；返回 false 表示超时。
    /// `NEVER_TIMEOUT` 表示无限等待。
    fn acquire(&self, timeout_ms: u32) -> bool;

    /// 释放一个计数（可在事件处理上下文调用）。
    fn release(&self);
}

/// RTOS 能力（对应 cy_rtos_init_semaphore / cy_rtos_delay_milliseconds / cy_rtos_get_time）
pub trait Rtos: Send + Sync {
    fn semaphore(&self, max_count: u32, init_count: u32) -> Arc<dyn Semaphore>;

    fn delay_ms(&self, ms: u32);

    /// 自由运行毫秒时基（回绕由调用方用差值处理）。
    fn time_ms(&self) -> u32;
}
