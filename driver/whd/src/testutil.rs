//! 测试件：脚本化假总线 + 假 RTOS
//!
//! ScriptedBus 扮演固件侧：对每条控制命令同步生成响应帧，并按脚本在
//! 特定触发命令（join / escan / ...）之后回放事件帧。帧经 `connect`
//! 注册的投递闭包送回核心（等价平台 RX 路径）。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use axerrno::AxResult;
use chip::{BusDir, BusFunction, BusOps, Rtos, Semaphore};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::cdc::{self, CdcHeader, CDC_HEADER_LEN};
use crate::events::{EventHeader, WHD_EVENT_HEADER_LEN};
use crate::types::Mac;

// ============================ TestRtos ============================

/// 非阻塞假 RTOS：信号量为计数器，延时与时基走虚拟时钟
pub struct TestRtos {
    now_ms: AtomicU32,
}

impl TestRtos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicU32::new(0),
        })
    }
}

pub struct CountSem {
    count: spin::Mutex<u32>,
    max: u32,
}

impl Semaphore for CountSem {
    fn acquire(&self, _timeout_ms: u32) -> bool {
        let mut c = self.count.lock();
        if *c > 0 {
            *c -= 1;
            true
        } else {
            false
        }
    }

    fn release(&self) {
        let mut c = self.count.lock();
        if *c < self.max {
            *c += 1;
        }
    }
}

impl Rtos for TestRtos {
    fn semaphore(&self, max_count: u32, init_count: u32) -> Arc<dyn Semaphore> {
        Arc::new(CountSem {
            count: spin::Mutex::new(init_count),
            max: max_count.max(1),
        })
    }

    fn delay_ms(&self, ms: u32) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    fn time_ms(&self) -> u32 {
        // 每次取时推进 100ms：等待循环在测试中快速走完预算
        self.now_ms.fetch_add(100, Ordering::Relaxed)
    }
}

// ============================ ScriptedBus ============================

/// 解析后的已发送命令记录
#[derive(Debug, Clone)]
pub struct SentCmd {
    pub cmd: u32,
    pub set: bool,
    pub tx_id: u16,
    pub ifidx: u8,
    pub iovar: Option<String>,
    /// IOVAR 时为变量名之后的参数区，IOCTL 时为整个载荷
    pub payload: Vec<u8>,
}

/// 送回核心的帧
pub enum WireFrame {
    Control(Vec<u8>),
    Event(Vec<u8>),
}

type Deliver = Box<dyn Fn(&WireFrame) + Send + Sync>;
type Probe = Box<dyn Fn() + Send + Sync>;

pub struct ScriptedBus {
    up: AtomicBool,
    deliver: spin::Mutex<Option<Deliver>>,
    probe: spin::Mutex<Option<Probe>>,
    sent: spin::Mutex<Vec<SentCmd>>,
    muted: AtomicBool,
    corrupt_tx_id: AtomicBool,
    unsupported_iovars: spin::Mutex<Vec<String>>,
    iovar_responses: spin::Mutex<Vec<(String, Vec<u8>)>>,
    cmd_responses: spin::Mutex<Vec<(u32, Vec<u8>)>>,
    /// (触发 iovar 名或 "" 表示 WLC_SET_SSID, 事件帧列表)
    event_scripts: spin::Mutex<Vec<(String, Vec<Vec<u8>>)>>,
    /// 背板字读取脚本（控制台结构指针等）
    backplane_words: spin::Mutex<Vec<(u32, u32)>>,
    /// 背板块读取脚本（控制台环形缓冲内容等）
    backplane_regions: spin::Mutex<Vec<(u32, Vec<u8>)>>,
}

impl ScriptedBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(false),
            deliver: spin::Mutex::new(None),
            probe: spin::Mutex::new(None),
            sent: spin::Mutex::new(Vec::new()),
            muted: AtomicBool::new(false),
            corrupt_tx_id: AtomicBool::new(false),
            unsupported_iovars: spin::Mutex::new(Vec::new()),
            iovar_responses: spin::Mutex::new(Vec::new()),
            cmd_responses: spin::Mutex::new(Vec::new()),
            event_scripts: spin::Mutex::new(Vec::new()),
            backplane_words: spin::Mutex::new(Vec::new()),
            backplane_regions: spin::Mutex::new(Vec::new()),
        })
    }

    pub fn script_backplane_word(&self, address: u32, value: u32) {
        self.backplane_words.lock().push((address, value));
    }

    pub fn script_backplane_bytes(&self, address: u32, data: &[u8]) {
        self.backplane_regions.lock().push((address, data.to_vec()));
    }

    /// 注册投递闭包（平台 RX 路径等价物）
    pub fn connect(&self, f: impl Fn(&WireFrame) + Send + Sync + 'static) {
        *self.deliver.lock() = Some(Box::new(f));
    }

    /// 每次发送时先执行（观测互锁状态等）
    pub fn set_probe(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.probe.lock() = Some(Box::new(f));
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::Relaxed);
    }

    pub fn corrupt_tx_id(&self) {
        self.corrupt_tx_id.store(true, Ordering::Relaxed);
    }

    pub fn mark_iovar_unsupported(&self, name: &str) {
        self.unsupported_iovars.lock().push(String::from(name));
    }

    pub fn script_iovar_response(&self, name: &str, data: &[u8]) {
        self.iovar_responses
            .lock()
            .push((String::from(name), data.to_vec()));
    }

    pub fn script_cmd_response(&self, cmd: u32, data: &[u8]) {
        self.cmd_responses.lock().push((cmd, data.to_vec()));
    }

    /// 在指定 IOVAR（或 trigger=""：WLC_SET_SSID IOCTL）被下发后回放事件帧
    pub fn script_events_on(&self, trigger: &str, frames: Vec<Vec<u8>>) {
        self.event_scripts
            .lock()
            .push((String::from(trigger), frames));
    }

    pub fn sent_commands(&self) -> Vec<SentCmd> {
        self.sent.lock().clone()
    }

    pub fn iovar_was_set(&self, name: &str) -> bool {
        self.sent
            .lock()
            .iter()
            .any(|c| c.set && c.iovar.as_deref() == Some(name))
    }

    pub fn cmd_was_sent(&self, cmd: u32) -> bool {
        self.sent.lock().iter().any(|c| c.cmd == cmd)
    }

    fn parse(frame: &[u8]) -> Option<SentCmd> {
        let header = CdcHeader::decode(frame).ok()?;
        let payload = frame[CDC_HEADER_LEN..].to_vec();
        let (iovar, payload) =
            if header.cmd == cdc::WLC_GET_VAR || header.cmd == cdc::WLC_SET_VAR {
                let nul = payload.iter().position(|b| *b == 0)?;
                let name = String::from_utf8(payload[..nul].to_vec()).ok()?;
                (Some(name), payload[nul + 1..].to_vec())
            } else {
                (None, payload)
            };
        Some(SentCmd {
            cmd: header.cmd,
            set: header.flags & cdc::CDCF_IOC_SET != 0,
            tx_id: header.tx_id(),
            ifidx: ((header.flags & cdc::CDCF_IOC_IF_MASK) >> cdc::CDCF_IOC_IF_SHIFT) as u8,
            iovar,
            payload,
        })
    }

    fn respond(&self, frame: &[u8], sent: &SentCmd) {
        let deliver = self.deliver.lock();
        let deliver = match deliver.as_ref() {
            Some(d) => d,
            None => return,
        };

        let mut header = CdcHeader::decode(frame).unwrap();
        if self.corrupt_tx_id.load(Ordering::Relaxed) {
            header.flags = (header.flags & !cdc::CDCF_IOC_ID_MASK)
                | ((header.tx_id().wrapping_add(1) as u32) << cdc::CDCF_IOC_ID_SHIFT);
        }

        let unsupported = match &sent.iovar {
            Some(name) => self
                .unsupported_iovars
                .lock()
                .iter()
                .any(|n| n == name),
            None => false,
        };

        let body: Vec<u8> = if unsupported {
            header.flags |= cdc::CDCF_IOC_ERROR;
            header.status = cdc::BCME_UNSUPPORTED as u32;
            Vec::new()
        } else if let Some(name) = &sent.iovar {
            // GET 响应从缓冲起始写值（名字区被固件覆写）
            self.iovar_responses
                .lock()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, d)| d.clone())
                .unwrap_or_else(|| sent.payload.clone())
        } else {
            self.cmd_responses
                .lock()
                .iter()
                .find(|(c, _)| *c == sent.cmd)
                .map(|(_, d)| d.clone())
                .unwrap_or_else(|| frame[CDC_HEADER_LEN..].to_vec())
        };

        let mut response = alloc::vec![0u8; CDC_HEADER_LEN + body.len()];
        header.encode(&mut response);
        response[CDC_HEADER_LEN..].copy_from_slice(&body);
        deliver(&WireFrame::Control(response));

        // 触发脚本事件：join/escan 等 IOVAR 或 WLC_SET_SSID
        let trigger_name = match &sent.iovar {
            Some(n) => n.clone(),
            None if sent.cmd == cdc::WLC_SET_SSID => String::new(),
            None => return,
        };
        let frames: Vec<Vec<u8>> = {
            let mut scripts = self.event_scripts.lock();
            match scripts.iter_mut().find(|(t, _)| *t == trigger_name) {
                Some((_, f)) => core::mem::take(f),
                None => return,
            }
        };
        for ev in frames {
            deliver(&WireFrame::Event(ev));
        }
    }
}

impl BusOps for ScriptedBus {
    fn read_register(&self, _f: BusFunction, address: u32, _n: u8) -> AxResult<u32> {
        Ok(match address {
            chip::SDIO_CHIP_CLOCK_CSR => (chip::SBSDIO_HT_AVAIL | chip::SBSDIO_ALP_AVAIL) as u32,
            chip::SDIO_SLEEP_CSR => {
                (chip::SBSDIO_SLPCSR_KEEP_WL_KSO | chip::SBSDIO_SLPCSR_WL_DEVON) as u32
            }
            _ => 0,
        })
    }
    fn write_register(&self, _f: BusFunction, _a: u32, _n: u8, _v: u32) -> AxResult<()> {
        Ok(())
    }
    fn read_backplane(&self, address: u32, _n: u8) -> AxResult<u32> {
        Ok(self
            .backplane_words
            .lock()
            .iter()
            .find(|(a, _)| *a == address)
            .map(|(_, v)| *v)
            .unwrap_or(0))
    }
    fn write_backplane(&self, _a: u32, _n: u8, _v: u32) -> AxResult<()> {
        Ok(())
    }
    fn transfer_backplane_bytes(&self, dir: BusDir, address: u32, buffer: &mut [u8]) -> AxResult<()> {
        if dir == BusDir::Read {
            let regions = self.backplane_regions.lock();
            for (start, data) in regions.iter() {
                let end = start + data.len() as u32;
                if address >= *start && address < end {
                    let off = (address - start) as usize;
                    let n = buffer.len().min(data.len() - off);
                    buffer[..n].copy_from_slice(&data[off..off + n]);
                    break;
                }
            }
        }
        Ok(())
    }
    fn send_buffer(&self, frame: &[u8]) -> AxResult<()> {
        if let Some(p) = self.probe.lock().as_ref() {
            p();
        }
        let sent = match Self::parse(frame) {
            Some(s) => s,
            None => return Ok(()),
        };
        self.sent.lock().push(sent.clone());
        if !self.muted.load(Ordering::Relaxed) {
            self.respond(frame, &sent);
        }
        Ok(())
    }
    fn wakeup(&self) -> AxResult<()> {
        Ok(())
    }
    fn sleep(&self) -> AxResult<()> {
        Ok(())
    }
    fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }
    fn set_state(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }
}

// ============================ 完整驱动装配 ============================

use crate::management::{WhdDriver, WhdInterface};
use pkt::HeapBufferPool;

/// 组一个接着脚本总线的完整驱动（事件/响应经 connect 闭包回注入核心）
pub fn scripted_driver(chip_id: u16) -> (Arc<WhdDriver>, Arc<WhdInterface>, Arc<ScriptedBus>) {
    let rtos = TestRtos::new();
    let bus = ScriptedBus::new();
    let driver = WhdDriver::init(bus.clone(), Box::new(HeapBufferPool), rtos, chip_id);
    let weak = Arc::downgrade(&driver);
    bus.connect(move |frame| {
        if let Some(d) = weak.upgrade() {
            match frame {
                WireFrame::Control(bytes) => d.process_control_response(bytes),
                WireFrame::Event(bytes) => d.process_event_frame(bytes),
            }
        }
    });
    let ifp = driver.wifi_on().expect("wifi_on");
    (driver, ifp, bus)
}

// ============================ 事件帧构造 ============================

pub fn event_frame(
    event_type: u32,
    status: u32,
    reason: u32,
    flags: u16,
    ifidx: u8,
    data: &[u8],
) -> Vec<u8> {
    let header = EventHeader {
        version: 1,
        flags,
        event_type,
        status,
        reason,
        auth_type: 0,
        datalen: data.len() as u32,
        addr: Mac([2, 0, 0, 0, 0, 1]),
        ifidx,
        bsscfgidx: ifidx,
    };
    let mut frame = alloc::vec![0u8; WHD_EVENT_HEADER_LEN + data.len()];
    header.encode(&mut frame);
    frame[WHD_EVENT_HEADER_LEN..].copy_from_slice(data);
    frame
}
