//! 命令通道（C2）
//!
//! 对应 whd_cdc_bdc.c whd_cdc_send_ioctl / whd_cdc_send_iovar：控制消息
//! 独占串行下发，事务号配对请求与响应，总线超时报 IoctlTimeout。
//!
//! 保证：
//! - 互斥：任一时刻至多一条命令在总线上
//! - 发送前经电源互锁把芯片拉到可寻址状态，响应（或超时）后释放
//! - 响应 tx_id 不匹配报 BadTxId
//! - 固件答复 unsupported 单独成错（WlanUnsupported），供上层选择忽略

use alloc::sync::Arc;
use chip::{BusOps, Rtos, Semaphore, WlanChip, NEVER_TIMEOUT};
use core::sync::atomic::{AtomicU16, Ordering};
use pkt::Packet;

use crate::cdc::{self, CdcHeader, CDC_HEADER_LEN};
use crate::result::{WhdError, WhdResult};

/// 单命令总线超时（对应 WHD_IOCTL_TIMEOUT_MS）
pub const WHD_IOCTL_TIMEOUT_MS: u32 = 5000;

enum Pending {
    Idle,
    Waiting { tx_id: u16 },
    Done { result: WhdResult<Packet> },
}

/// 命令通道：事务计数 + 单槽响应位
pub struct CommandChannel {
    /// 一条在途命令的互斥（对应 whd_thread 的 ioctl mutex 信号量）
    mutex: Arc<dyn Semaphore>,
    /// 响应到达信号（由 RX 路径释放）
    response_sem: Arc<dyn Semaphore>,
    tx_id: AtomicU16,
    pending: spin::Mutex<Pending>,
}

impl CommandChannel {
    pub fn new(rtos: &dyn Rtos) -> Self {
        Self {
            mutex: rtos.semaphore(1, 1),
            response_sem: rtos.semaphore(1, 0),
            tx_id: AtomicU16::new(0),
            pending: spin::Mutex::new(Pending::Idle),
        }
    }

    /// GET 类 IOCTL：返回响应缓冲（含固件回填数据），由调用方检视后释放。
    pub fn get_ioctl(
        &self,
        wlan: &WlanChip,
        ifidx: u8,
        cmd: u32,
        tx: Packet,
    ) -> WhdResult<Packet> {
        self.do_ioctl(wlan, ifidx, cmd, tx, false)
    }

    /// SET 类 IOCTL：只关心状态，响应缓冲就地释放。
    pub fn set_ioctl(&self, wlan: &WlanChip, ifidx: u8, cmd: u32, tx: Packet) -> WhdResult<()> {
        self.do_ioctl(wlan, ifidx, cmd, tx, true).map(|_| ())
    }

    /// GET 类 IOVAR（包需已由 get_iovar_buffer 布好变量名）
    pub fn get_iovar(&self, wlan: &WlanChip, ifidx: u8, tx: Packet) -> WhdResult<Packet> {
        self.do_ioctl(wlan, ifidx, cdc::WLC_GET_VAR, tx, false)
    }

    pub fn set_iovar(&self, wlan: &WlanChip, ifidx: u8, tx: Packet) -> WhdResult<()> {
        self.do_ioctl(wlan, ifidx, cdc::WLC_SET_VAR, tx, true)
            .map(|_| ())
    }

    fn do_ioctl(
        &self,
        wlan: &WlanChip,
        ifidx: u8,
        cmd: u32,
        mut tx: Packet,
        set: bool,
    ) -> WhdResult<Packet> {
        if tx.len() > cdc::WHD_IOVAR_BUF_MAX {
            return Err(WhdError::BadArg);
        }
        self.mutex.acquire(NEVER_TIMEOUT);
        let result = self.do_ioctl_locked(wlan, ifidx, cmd, &mut tx, set);
        self.mutex.release();
        result
    }

    fn do_ioctl_locked(
        &self,
        wlan: &WlanChip,
        ifidx: u8,
        cmd: u32,
        tx: &mut Packet,
        set: bool,
    ) -> WhdResult<Packet> {
        // 发送前唤醒芯片，本次交换全程持 wake 引用
        wlan.keep_awake()?;
        let result = self.exchange(wlan, ifidx, cmd, tx, set);
        wlan.let_sleep();
        result
    }

    fn exchange(
        &self,
        wlan: &WlanChip,
        ifidx: u8,
        cmd: u32,
        tx: &mut Packet,
        set: bool,
    ) -> WhdResult<Packet> {
        let tx_id = self.tx_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let payload_len = tx.len() as u32;
        if !tx.push(CDC_HEADER_LEN) {
            return Err(WhdError::BufferAllocFail);
        }
        let header = CdcHeader::new(cmd, payload_len, tx_id, ifidx, set);
        header.encode(tx.data_mut());

        *self.pending.lock() = Pending::Waiting { tx_id };

        if let Err(e) = wlan.bus.send_buffer(tx.data()) {
            log::warn!(target: "whd::ioctl", "send cmd={} failed: {:?}", cmd, e);
            *self.pending.lock() = Pending::Idle;
            return Err(e.into());
        }

        if !self.response_sem.acquire(WHD_IOCTL_TIMEOUT_MS) {
            log::error!(target: "whd::ioctl", "cmd={} tx_id={} timed out", cmd, tx_id);
            *self.pending.lock() = Pending::Idle;
            return Err(WhdError::IoctlTimeout);
        }

        let done = core::mem::replace(&mut *self.pending.lock(), Pending::Idle);
        match done {
            Pending::Done { result } => result,
            // 信号与状态不一致只能按超时处理
            _ => Err(WhdError::IoctlTimeout),
        }
    }

    /// RX 路径入口：控制响应帧（CDC 头 + 数据）。
    /// 返回 true 表示该帧已被本通道消费。
    pub fn process_response(&self, frame: &[u8]) -> bool {
        let header = match CdcHeader::decode(frame) {
            Ok(h) => h,
            Err(_) => return false,
        };
        let mut pending = self.pending.lock();
        let expected = match *pending {
            Pending::Waiting { tx_id } => tx_id,
            _ => {
                log::debug!(target: "whd::ioctl", "unsolicited response cmd={} dropped", header.cmd);
                return false;
            }
        };
        let result = if header.tx_id() != expected {
            log::warn!(
                target: "whd::ioctl",
                "response tx_id {} != request {}",
                header.tx_id(),
                expected
            );
            Err(WhdError::BadTxId)
        } else {
            header.firmware_result().map(|_| {
                let mut pkt = Packet::from_slice(frame);
                pkt.pull(CDC_HEADER_LEN);
                pkt
            })
        };
        *pending = Pending::Done { result };
        drop(pending);
        self.response_sem.release();
        true
    }
}
