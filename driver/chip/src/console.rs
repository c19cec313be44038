//! 固件控制台读取
//!
//! 对应 whd_chip.c whd_wifi_read_wlan_log_unsafe：固件把 wlan_shared 结构
//! 地址写在 RAM 末字，host 经背板追着 console 环形缓冲的写指针读增量。
//! 背板访问需要 HT 时钟，读取期间持 wake 引用。

use axerrno::{AxError, AxResult};

use crate::bus::BusOps;
use crate::power::WlanChip;

/// 控制台读游标（Driver 级状态：上次读到的环形缓冲下标）
pub struct ConsoleCursor {
    console_addr: u32,
    last_idx: u32,
}

impl ConsoleCursor {
    pub const fn new() -> Self {
        Self {
            console_addr: 0,
            last_idx: 0,
        }
    }
}

// wlan_shared_t 内 console_addr 字段偏移：flags/trap_addr/assert_exp_addr/
// assert_file_addr/assert_line 各 4 字节之后
const SHARED_CONSOLE_ADDR_OFFSET: u32 = 20;
// console_t 内 log 结构偏移（跳过 vcons_in/vcons_out）
const CONSOLE_LOG_BUF_OFFSET: u32 = 8;
const CONSOLE_LOG_SIZE_OFFSET: u32 = 12;
const CONSOLE_LOG_IDX_OFFSET: u32 = 16;

impl WlanChip {
    /// 读取自上次调用以来的新控制台字节，返回写入 out 的长度。
    ///
    /// `wlan_shared_addr` 为 RAM 末字地址（平台按芯片 RAM 布局算出）。
    pub fn read_console_log(&self, wlan_shared_addr: u32, out: &mut [u8]) -> AxResult<usize> {
        self.keep_awake()?;
        let result = self.read_console_log_unsafe(wlan_shared_addr, out);
        self.let_sleep();
        result
    }

    fn read_console_log_unsafe(&self, wlan_shared_addr: u32, out: &mut [u8]) -> AxResult<usize> {
        let mut cursor = self.console.lock();

        if cursor.console_addr == 0 {
            let shared_ptr = self.bus.read_backplane(wlan_shared_addr, 4)?;
            if shared_ptr == 0 || shared_ptr == 0xFFFF_FFFF {
                log::warn!(target: "chip::console", "wlan_shared pointer not initialised (0x{:08x})", shared_ptr);
                return Err(AxError::BadState);
            }
            cursor.console_addr = self
                .bus
                .read_backplane(shared_ptr + SHARED_CONSOLE_ADDR_OFFSET, 4)?;
            if cursor.console_addr == 0 {
                return Err(AxError::BadState);
            }
        }

        let base = cursor.console_addr;
        let log_buf = self.bus.read_backplane(base + CONSOLE_LOG_BUF_OFFSET, 4)?;
        let buf_size = self.bus.read_backplane(base + CONSOLE_LOG_SIZE_OFFSET, 4)?;
        let idx = self.bus.read_backplane(base + CONSOLE_LOG_IDX_OFFSET, 4)?;

        if buf_size == 0 || log_buf == 0 || idx >= buf_size {
            return Err(AxError::InvalidData);
        }
        if idx == cursor.last_idx {
            return Ok(0);
        }

        let mut written = 0usize;
        let mut pos = cursor.last_idx;
        while pos != idx && written < out.len() {
            // 环形缓冲：到 idx 或缓冲区尾为一段
            let seg_end = if pos < idx { idx } else { buf_size };
            let seg_len = ((seg_end - pos) as usize).min(out.len() - written);
            self.bus.transfer_backplane_bytes(
                crate::bus::BusDir::Read,
                log_buf + pos,
                &mut out[written..written + seg_len],
            )?;
            written += seg_len;
            pos = (pos + seg_len as u32) % buf_size;
        }
        cursor.last_idx = idx;
        Ok(written)
    }
}
