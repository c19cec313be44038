//! 事件分发（C3）
//!
//! 对应 whd_events.c / whd_events_int.h：固件异步事件帧头为
//! (event_type, status, reason, flags, bss_index, interface, datalen)，
//! 按 (接口, 事件码) 订阅表路由到处理器。注册返回稳定条目号供注销；
//! 表满报 TooManySubscriptions。
//!
//! 事件头沿 802.3 封装到达，多字节字段为网络序（与控制消息的小端不同）。
//! 处理器在驱动工作线程上执行，禁止嵌套下发控制命令。

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::result::{WhdError, WhdResult};
use crate::types::Mac;

// 事件码（whd_events.h WLC_E_*）
pub const WLC_E_SET_SSID: u32 = 0;
pub const WLC_E_JOIN: u32 = 1;
pub const WLC_E_AUTH: u32 = 3;
pub const WLC_E_AUTH_IND: u32 = 4;
pub const WLC_E_DEAUTH: u32 = 5;
pub const WLC_E_DEAUTH_IND: u32 = 6;
pub const WLC_E_ASSOC: u32 = 7;
pub const WLC_E_ASSOC_IND: u32 = 8;
pub const WLC_E_REASSOC: u32 = 9;
pub const WLC_E_REASSOC_IND: u32 = 10;
pub const WLC_E_DISASSOC: u32 = 11;
pub const WLC_E_DISASSOC_IND: u32 = 12;
pub const WLC_E_LINK: u32 = 16;
pub const WLC_E_PSK_SUP: u32 = 46;
pub const WLC_E_ESCAN_RESULT: u32 = 69;
pub const WLC_E_CSA_COMPLETE_IND: u32 = 80;
pub const WLC_E_EXT_AUTH_REQ: u32 = 187;
pub const WLC_E_EXT_AUTH_FRAME_RX: u32 = 188;
pub const WLC_E_ICMP_ECHO_REQ: u32 = 190;
/// 事件号上界（事件掩码位向量按此定长）
pub const WLC_E_LAST: u32 = 192;
/// 订阅列表结束标记
pub const WLC_E_NONE: u32 = 0xFFFF_FFFF;

// 事件状态（whd_event_status_t）
pub const WLC_E_STATUS_SUCCESS: u32 = 0;
pub const WLC_E_STATUS_FAIL: u32 = 1;
pub const WLC_E_STATUS_TIMEOUT: u32 = 2;
pub const WLC_E_STATUS_NO_NETWORKS: u32 = 3;
pub const WLC_E_STATUS_ABORT: u32 = 4;
pub const WLC_E_STATUS_UNSOLICITED: u32 = 6;
pub const WLC_E_STATUS_PARTIAL: u32 = 8;
pub const WLC_E_STATUS_NEWSCAN: u32 = 9;
pub const WLC_E_STATUS_NEWASSOC: u32 = 10;

// WLC_E_PSK_SUP 的 status（补充认证状态机）
pub const WLC_SUP_DISCONNECTED: u32 = 0;
pub const WLC_SUP_AUTHENTICATED: u32 = 4;
pub const WLC_SUP_KEYXCHANGE: u32 = 5;
pub const WLC_SUP_KEYED: u32 = 6;
pub const WLC_SUP_TIMEOUT: u32 = 7;
pub const WLC_SUP_KEYXCHANGE_WAIT_M1: u32 = WLC_SUP_AUTHENTICATED;
pub const WLC_SUP_KEYXCHANGE_WAIT_M3: u32 = 8;
pub const WLC_SUP_KEYXCHANGE_WAIT_G1: u32 = 10;

// WLC_E_PSK_SUP 的 reason
pub const WLC_E_SUP_WPA_PSK_TMO: u32 = 16;

/// WLC_E_LINK flags：链路在位
pub const WLC_EVENT_MSG_LINK: u16 = 0x01;

/// 事件头长度（whd_event_msg）
pub const WHD_EVENT_HEADER_LEN: usize = 48;

/// 未注册条目哨兵（接口 event_reg_list 用）
pub const WHD_EVENT_NOT_REGISTERED: u16 = 0xFF;
/// 订阅表容量
pub const WHD_MAX_EVENT_SUBSCRIPTION: usize = 33;

/// 事件头（对应 whd_event_header_t）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub version: u16,
    pub flags: u16,
    pub event_type: u32,
    pub status: u32,
    pub reason: u32,
    pub auth_type: u32,
    pub datalen: u32,
    pub addr: Mac,
    pub ifidx: u8,
    pub bsscfgidx: u8,
}

impl EventHeader {
    /// 线上解码（网络序）。ifname 16 字节仅日志用途，跳过。
    pub fn decode(buf: &[u8]) -> WhdResult<Self> {
        if buf.len() < WHD_EVENT_HEADER_LEN {
            return Err(WhdError::PartialResults);
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&buf[24..30]);
        Ok(Self {
            version: u16::from_be_bytes([buf[0], buf[1]]),
            flags: u16::from_be_bytes([buf[2], buf[3]]),
            event_type: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            status: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            reason: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            auth_type: u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]),
            datalen: u32::from_be_bytes([buf[20], buf[21], buf[22], buf[23]]),
            addr: Mac(addr),
            ifidx: buf[46],
            bsscfgidx: buf[47],
        })
    }

    /// 线上编码（回环与仿真用）
    pub fn encode(&self, out: &mut [u8]) {
        out[..WHD_EVENT_HEADER_LEN].fill(0);
        out[0..2].copy_from_slice(&self.version.to_be_bytes());
        out[2..4].copy_from_slice(&self.flags.to_be_bytes());
        out[4..8].copy_from_slice(&self.event_type.to_be_bytes());
        out[8..12].copy_from_slice(&self.status.to_be_bytes());
        out[12..16].copy_from_slice(&self.reason.to_be_bytes());
        out[16..20].copy_from_slice(&self.auth_type.to_be_bytes());
        out[20..24].copy_from_slice(&self.datalen.to_be_bytes());
        out[24..30].copy_from_slice(&self.addr.0);
        out[46] = self.ifidx;
        out[47] = self.bsscfgidx;
    }
}

/// 事件处理器：在工作线程上 O(1) 执行，经闭包携带各自上下文
pub type EventHandler = Box<dyn FnMut(&EventHeader, &[u8]) + Send>;

struct Entry {
    events: Vec<u32>,
    ifidx: u8,
    /// 分发期间暂取出；None 且 dereg_pending 表示执行中被注销
    handler: Option<EventHandler>,
    dereg_pending: bool,
}

/// 订阅表（对应 whd_event_list_entry 数组）
pub struct EventDispatcher {
    slots: spin::Mutex<Vec<Option<Entry>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(WHD_MAX_EVENT_SUBSCRIPTION);
        slots.resize_with(WHD_MAX_EVENT_SUBSCRIPTION, || None);
        Self {
            slots: spin::Mutex::new(slots),
        }
    }

    /// 注册处理器，返回稳定条目号；表满报 TooManySubscriptions。
    /// `events` 以 WLC_E_NONE 结尾的列表或纯列表均可。
    pub fn register(
        &self,
        ifidx: u8,
        events: &[u32],
        handler: EventHandler,
    ) -> WhdResult<u16> {
        let events: Vec<u32> = events
            .iter()
            .copied()
            .filter(|e| *e != WLC_E_NONE)
            .collect();
        let mut slots = self.slots.lock();
        for (i, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(Entry {
                    events,
                    ifidx,
                    handler: Some(handler),
                    dereg_pending: false,
                });
                log::debug!(target: "whd::events", "register entry={} ifidx={}", i, ifidx);
                return Ok(i as u16);
            }
        }
        log::warn!(target: "whd::events", "subscription table full");
        Err(WhdError::TooManySubscriptions)
    }

    /// 注销：对已空条目幂等（no-op 返回 Ok）。
    /// 条目在其处理器执行期间被注销时，延迟到处理器返回后回收。
    pub fn deregister(&self, entry: u16) -> WhdResult<()> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(entry as usize) {
            let clear = match slot {
                Some(e) => {
                    if e.handler.is_some() {
                        true
                    } else {
                        e.dereg_pending = true;
                        false
                    }
                }
                None => false,
            };
            if clear {
                *slot = None;
            }
        }
        Ok(())
    }

    /// 按 (接口, 事件码) 路由一条事件。处理器调用期间释放表锁，
    /// 条目在处理器返回前不会被复用。
    pub fn dispatch(&self, header: &EventHeader, data: &[u8]) {
        for i in 0..WHD_MAX_EVENT_SUBSCRIPTION {
            let mut handler = {
                let mut slots = self.slots.lock();
                match &mut slots[i] {
                    Some(e)
                        if e.ifidx == header.ifidx
                            && e.events.contains(&header.event_type) =>
                    {
                        match e.handler.take() {
                            Some(h) => h,
                            None => continue,
                        }
                    }
                    _ => continue,
                }
            };
            handler(header, data);
            let mut slots = self.slots.lock();
            let clear = match &mut slots[i] {
                Some(e) => {
                    if e.dereg_pending {
                        true
                    } else {
                        e.handler = Some(handler);
                        false
                    }
                }
                None => false,
            };
            if clear {
                slots[i] = None;
            }
        }
    }

    /// 当前订阅事件码并集的位向量（`bsscfg:event_msgs` 下发内容）
    pub fn event_mask(&self) -> [u8; (WLC_E_LAST as usize + 7) / 8] {
        let mut mask = [0u8; (WLC_E_LAST as usize + 7) / 8];
        let slots = self.slots.lock();
        for slot in slots.iter().flatten() {
            for e in &slot.events {
                if *e < WLC_E_LAST {
                    mask[(*e / 8) as usize] |= 1 << (*e % 8);
                }
            }
        }
        mask
    }
}
