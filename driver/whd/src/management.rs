//! 驱动与接口生命周期（对应 whd_management.c / whd_int.h）
//!
//! 单驱动实例：多个接口共享同一命令通道与事件分发器。接口持驱动的
//! 非拥有引用（Weak），处理器经分发器拿上下文，不形成环。

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};
use chip::{BusOps, Rtos, Semaphore, WlanChip};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use pkt::BufferPool;

use crate::cdc::IOVAR_STR_EVENT_MSGS;
use crate::events::{EventDispatcher, EventHandler, EventHeader, WHD_EVENT_HEADER_LEN,
                    WHD_EVENT_NOT_REGISTERED};
use crate::ioctl::CommandChannel;
use crate::join::AuthCallback;
use crate::result::{WhdError, WhdResult};
use crate::scan::ScanCallback;
use crate::types::{Mac, Role, WlanState};

/// 逻辑 BSS 上限（对应 WHD_INTERFACE_MAX）
pub const WHD_INTERFACE_MAX: usize = 3;

// 接口事件登记槽（对应 whd_interface_t event_reg_list 下标）
pub(crate) const WHD_SCAN_EVENT_ENTRY: usize = 0;
pub(crate) const WHD_JOIN_EVENT_ENTRY: usize = 1;
pub(crate) const WHD_AUTH_EVENT_ENTRY: usize = 2;
pub(crate) const WHD_ICMP_ECHO_REQ_EVENT_ENTRY: usize = 3;
pub(crate) const WHD_EVENT_ENTRY_MAX: usize = 5;

/// ICMP echo-req 事件回调（载荷透传）
pub type IcmpEchoReqCallback = Box<dyn FnMut(&EventHeader, &[u8]) + Send>;

/// 驱动内部可变状态（对应 whd_internal_info_t）
pub(crate) struct InternalInfo {
    /// 每接口 join 状态位集：仅事件分发任务翻转，命令任务在
    /// join 信号量被释放后读取
    pub join_status: [AtomicU32; WHD_INTERFACE_MAX],
    /// active-join 互斥：保护 join 信号量指针的换入换出，
    /// 驱动生命周期内常驻（leave 与进行中的 join 由它串行化）
    pub active_join_mutex: Arc<dyn Semaphore>,
    pub active_join_sem: spin::Mutex<Option<Arc<dyn Semaphore>>>,
    pub scan_callback: spin::Mutex<Option<ScanCallback>>,
    pub auth_callback: spin::Mutex<Option<AuthCallback>>,
    pub icmp_echo_req_callback: spin::Mutex<Option<IcmpEchoReqCallback>>,
    /// 最近一条扫描记录是否带 SAE-H2E（外部认证请求回调要转告）
    pub last_scan_h2e: AtomicBool,
    pub ap_is_up: AtomicBool,
    pub p2p_go_is_up: AtomicBool,
}

/// 进程级控制器句柄（对应 whd_driver_t）
pub struct WhdDriver {
    pub(crate) wlan: Arc<WlanChip>,
    pub(crate) pool: Box<dyn BufferPool>,
    pub(crate) rtos: Arc<dyn Rtos>,
    pub(crate) channel: CommandChannel,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) internal: InternalInfo,
    wlan_state: AtomicU32,
    ifaces: spin::Mutex<[Option<Arc<WhdInterface>>; WHD_INTERFACE_MAX]>,
}

/// 逻辑 BSS 上下文（对应 whd_interface_t）；不拥有任何缓冲
pub struct WhdInterface {
    driver: Weak<WhdDriver>,
    pub(crate) role: AtomicU32,
    pub(crate) bsscfgidx: u8,
    pub(crate) ifidx: u8,
    pub(crate) mac: spin::Mutex<Mac>,
    pub(crate) event_reg_list: spin::Mutex<[u16; WHD_EVENT_ENTRY_MAX]>,
}

impl WhdDriver {
    /// 创建驱动（对应 whd_init）；总线/缓冲池/RTOS 能力由平台注入。
    pub fn init(
        bus: Arc<dyn BusOps>,
        pool: Box<dyn BufferPool>,
        rtos: Arc<dyn Rtos>,
        chip_id: u16,
    ) -> Arc<WhdDriver> {
        let wlan = Arc::new(WlanChip::new(bus, rtos.clone(), chip_id));
        let channel = CommandChannel::new(&*rtos);
        let internal = InternalInfo {
            join_status: Default::default(),
            active_join_mutex: rtos.semaphore(1, 1),
            active_join_sem: spin::Mutex::new(None),
            scan_callback: spin::Mutex::new(None),
            auth_callback: spin::Mutex::new(None),
            icmp_echo_req_callback: spin::Mutex::new(None),
            last_scan_h2e: AtomicBool::new(false),
            ap_is_up: AtomicBool::new(false),
            p2p_go_is_up: AtomicBool::new(false),
        };
        Arc::new(WhdDriver {
            wlan,
            pool,
            rtos,
            channel,
            dispatcher: EventDispatcher::new(),
            internal,
            wlan_state: AtomicU32::new(WlanState::Off as u32),
            ifaces: spin::Mutex::new(Default::default()),
        })
    }

    /// 芯片侧就绪（对应 whd_wifi_on 的 host 部分）：save/restore 探测、
    /// 主接口创建、固件能力读取。固件下载在平台引导期已完成。
    pub fn wifi_on(self: &Arc<Self>) -> WhdResult<Arc<WhdInterface>> {
        self.wlan.enable_save_restore()?;
        let ifp = self.add_interface(0, 0, None)?;
        self.set_wlan_state(WlanState::Down);
        if let Err(e) = crate::api::read_fw_capabilities(self, &ifp) {
            log::debug!(target: "whd::mgmt", "fw capability read skipped: {:?}", e);
        }
        Ok(ifp)
    }

    /// 对应 whd_wifi_off：放掉芯片电源前的收尾
    pub fn wifi_off(&self) -> WhdResult<()> {
        self.set_wlan_state(WlanState::Off);
        Ok(())
    }

    /// 驱动拆除（对应 whd_deinit）；要求 WLAN 已 Off。
    pub fn deinit(&self) -> WhdResult<()> {
        if self.wlan_state() != WlanState::Off {
            log::error!(target: "whd::mgmt", "deinit while wifi power is on");
            return Err(WhdError::NotDown);
        }
        let mut ifaces = self.ifaces.lock();
        for slot in ifaces.iter_mut() {
            *slot = None;
        }
        Ok(())
    }

    /// 增加一个逻辑 BSS 接口（对应 whd_add_interface）
    pub fn add_interface(
        self: &Arc<Self>,
        bsscfgidx: u8,
        ifidx: u8,
        mac: Option<Mac>,
    ) -> WhdResult<Arc<WhdInterface>> {
        if bsscfgidx as usize >= WHD_INTERFACE_MAX {
            return Err(WhdError::InvalidInterface);
        }
        let mut ifaces = self.ifaces.lock();
        if let Some(existing) = &ifaces[bsscfgidx as usize] {
            return Ok(existing.clone());
        }
        let ifp = Arc::new(WhdInterface {
            driver: Arc::downgrade(self),
            role: AtomicU32::new(Role::Invalid as u32),
            bsscfgidx,
            ifidx,
            mac: spin::Mutex::new(mac.unwrap_or_default()),
            event_reg_list: spin::Mutex::new([WHD_EVENT_NOT_REGISTERED; WHD_EVENT_ENTRY_MAX]),
        });
        ifaces[bsscfgidx as usize] = Some(ifp.clone());
        Ok(ifp)
    }

    pub fn get_interface(&self, bsscfgidx: u8) -> Option<Arc<WhdInterface>> {
        self.ifaces
            .lock()
            .get(bsscfgidx as usize)
            .and_then(|s| s.clone())
    }

    pub fn primary_interface(&self) -> WhdResult<Arc<WhdInterface>> {
        self.get_interface(0).ok_or(WhdError::InvalidInterface)
    }

    #[inline]
    pub fn wlan_state(&self) -> WlanState {
        match self.wlan_state.load(Ordering::Acquire) {
            x if x == WlanState::Up as u32 => WlanState::Up,
            x if x == WlanState::Down as u32 => WlanState::Down,
            _ => WlanState::Off,
        }
    }

    #[inline]
    pub(crate) fn set_wlan_state(&self, state: WlanState) {
        self.wlan_state.store(state as u32, Ordering::Release);
    }

    /// 平台 RX 路径入口：控制响应帧
    pub fn process_control_response(&self, frame: &[u8]) {
        if !self.channel.process_response(frame) {
            log::debug!(target: "whd::mgmt", "control frame not matched, dropped");
        }
    }

    /// 平台 RX 路径入口（EventSource 能力）：事件帧 = 48 字节头 + 数据
    pub fn process_event_frame(&self, frame: &[u8]) {
        let header = match EventHeader::decode(frame) {
            Ok(h) => h,
            Err(_) => {
                log::warn!(target: "whd::mgmt", "runt event frame ({} bytes)", frame.len());
                return;
            }
        };
        if header.bsscfgidx as usize >= WHD_INTERFACE_MAX {
            log::debug!(target: "whd::mgmt", "event for bad interface {}", header.bsscfgidx);
            return;
        }
        let data = &frame[WHD_EVENT_HEADER_LEN..];
        let datalen = (header.datalen as usize).min(data.len());
        self.dispatcher.dispatch(&header, &data[..datalen]);
    }

    /// 注册事件处理器并同步固件事件掩码（对应 whd_management_set_event_handler）。
    /// 掩码为全表订阅并集，经 `bsscfg:event_msgs` 下发。
    pub(crate) fn set_event_handler(
        &self,
        ifp: &WhdInterface,
        events: &[u32],
        handler: EventHandler,
    ) -> WhdResult<u16> {
        let entry = self.dispatcher.register(ifp.ifidx, events, handler)?;
        let mask = self.dispatcher.event_mask();
        if let Err(e) =
            crate::api::set_bsscfg_iovar_buffer(self, ifp, IOVAR_STR_EVENT_MSGS, &mask)
        {
            self.dispatcher.deregister(entry)?;
            return Err(e);
        }
        Ok(entry)
    }

    /// 注销事件处理器。只动订阅表：掩码刷新推迟到下次注册，注销可在
    /// 事件处理器上下文调用而不触碰命令通道。
    pub(crate) fn deregister_event_handler(&self, entry: u16) -> WhdResult<()> {
        self.dispatcher.deregister(entry)
    }
}

impl WhdInterface {
    /// 非拥有引用换强引用；驱动已拆除报 InvalidInterface
    pub(crate) fn driver(&self) -> WhdResult<Arc<WhdDriver>> {
        self.driver.upgrade().ok_or(WhdError::InvalidInterface)
    }

    #[inline]
    pub fn bsscfgidx(&self) -> u8 {
        self.bsscfgidx
    }

    #[inline]
    pub fn role(&self) -> Role {
        match self.role.load(Ordering::Acquire) {
            x if x == Role::Sta as u32 => Role::Sta,
            x if x == Role::Ap as u32 => Role::Ap,
            x if x == Role::P2p as u32 => Role::P2p,
            _ => Role::Invalid,
        }
    }

    #[inline]
    pub(crate) fn set_role(&self, role: Role) {
        self.role.store(role as u32, Ordering::Release);
    }

    pub fn mac_address(&self) -> Mac {
        *self.mac.lock()
    }

    pub(crate) fn event_entry(&self, slot: usize) -> u16 {
        self.event_reg_list.lock()[slot]
    }

    pub(crate) fn set_event_entry(&self, slot: usize, entry: u16) {
        self.event_reg_list.lock()[slot] = entry;
    }
}
