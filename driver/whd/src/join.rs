//! STA 接入状态机（C5）
//!
//! 对应 whd_wifi_api.c 的 join 族：scan → prepare → associate →
//! authenticate → key-exchange → link-up 的线性推进，由两路事件源驱动：
//! 命令通道的同步响应 + 分发器路由的异步 join 事件。每接口的
//! JoinStatus 位集仅由分发任务翻转；命令任务在 join 信号量被释放后
//! 读取并分类出唯一终态。
//!
//! join 全程持一个补充 wake 引用，scan/associate/key-exchange 之间
//! 芯片不得入睡。

use alloc::boxed::Box;
use alloc::sync::Arc;
use chip::{FwCap, Rtos, Semaphore, NEVER_TIMEOUT};
use core::sync::atomic::Ordering;

use crate::cdc;
use crate::events::*;
use crate::management::{
    WhdDriver, WhdInterface, WHD_AUTH_EVENT_ENTRY, WHD_INTERFACE_MAX, WHD_JOIN_EVENT_ENTRY,
};
use crate::result::{UnsupportedOk, WhdError, WhdResult};
use crate::types::*;
use crate::wire;

/// 一次 join 的总预算（毫秒）：固件全信道扫描 ~2.8s + psk→pmk ~2s +
/// 固件内 join 定时器 5s
pub const DEFAULT_JOIN_ATTEMPT_TIMEOUT: u32 = 9000;
/// 等待 EAPOL M1/M3 的超时（毫秒）；小区边缘 1000ms 不够用
pub const DEFAULT_EAPOL_KEY_PACKET_TIMEOUT: i32 = 2500;

// JoinStatus 位集
pub(crate) const JOIN_ASSOCIATED: u32 = 1 << 0;
pub(crate) const JOIN_AUTHENTICATED: u32 = 1 << 1;
pub(crate) const JOIN_LINK_READY: u32 = 1 << 2;
pub(crate) const JOIN_SECURITY_COMPLETE: u32 = 1 << 3;
pub(crate) const JOIN_SSID_SET: u32 = 1 << 4;
pub(crate) const JOIN_NO_NETWORKS: u32 = 1 << 5;
pub(crate) const JOIN_EAPOL_KEY_M1_TIMEOUT: u32 = 1 << 6;
pub(crate) const JOIN_EAPOL_KEY_M3_TIMEOUT: u32 = 1 << 7;
pub(crate) const JOIN_EAPOL_KEY_G1_TIMEOUT: u32 = 1 << 8;
pub(crate) const JOIN_EAPOL_KEY_FAILURE: u32 = 1 << 9;

pub(crate) const JOIN_SECURITY_FLAGS_MASK: u32 = JOIN_SECURITY_COMPLETE
    | JOIN_EAPOL_KEY_M1_TIMEOUT
    | JOIN_EAPOL_KEY_M3_TIMEOUT
    | JOIN_EAPOL_KEY_G1_TIMEOUT
    | JOIN_EAPOL_KEY_FAILURE;

/// join 事件族
const JOIN_EVENTS: [u32; 8] = [
    WLC_E_SET_SSID,
    WLC_E_LINK,
    WLC_E_AUTH,
    WLC_E_DEAUTH_IND,
    WLC_E_DISASSOC_IND,
    WLC_E_PSK_SUP,
    WLC_E_CSA_COMPLETE_IND,
    WLC_E_NONE,
];

/// SAE 外部认证事件
const AUTH_EVENTS: [u32; 3] = [WLC_E_EXT_AUTH_REQ, WLC_E_EXT_AUTH_FRAME_RX, WLC_E_NONE];

/// 转交外部补充认证器的 SAE 材料
pub enum AuthEvent<'a> {
    /// 固件请求外部认证（WLC_E_EXT_AUTH_REQ）
    ExtAuthReq {
        status: wire::AuthReqStatus,
        sae_h2e: bool,
    },
    /// 外部认证帧到达（WLC_E_EXT_AUTH_FRAME_RX），已剥去接收元数据
    ExtAuthFrameRx { frame: &'a [u8] },
}

pub type AuthCallback = Box<dyn FnMut(AuthEvent<'_>) + Send>;

/// wl_rx_mgmt_data：version/chanspec/rssi/mactime/rate，帧体紧随
const WL_RX_MGMT_DATA_SIZE: usize = 16;

/// §位集 → 终态分类（对应 whd_wifi_check_join_status）
pub(crate) fn classify_join_status(status: u32) -> WhdResult<()> {
    // 固件报无匹配 BSS：其余位不影响结论
    if status & JOIN_NO_NETWORKS != 0 {
        return Err(WhdError::NetworkNotFound);
    }
    const A: u32 = JOIN_AUTHENTICATED;
    const L: u32 = JOIN_LINK_READY;
    const S: u32 = JOIN_SSID_SET;
    const SEC: u32 = JOIN_SECURITY_COMPLETE;
    match status {
        x if x == (A | L | JOIN_EAPOL_KEY_M1_TIMEOUT)
            || x == (A | L | S | JOIN_EAPOL_KEY_M1_TIMEOUT) =>
        {
            Err(WhdError::EapolKeyPacketM1Timeout)
        }
        x if x == (A | L | JOIN_EAPOL_KEY_M3_TIMEOUT)
            || x == (A | L | S | JOIN_EAPOL_KEY_M3_TIMEOUT) =>
        {
            Err(WhdError::EapolKeyPacketM3Timeout)
        }
        x if x == (A | L | JOIN_EAPOL_KEY_G1_TIMEOUT)
            || x == (A | L | S | JOIN_EAPOL_KEY_G1_TIMEOUT) =>
        {
            Err(WhdError::EapolKeyPacketG1Timeout)
        }
        x if x == (A | L | JOIN_EAPOL_KEY_FAILURE)
            || x == (A | L | S | JOIN_EAPOL_KEY_FAILURE) =>
        {
            Err(WhdError::EapolKeyFailure)
        }
        x if x == (A | L | S | SEC) => Ok(()),
        0 => Err(WhdError::NotAuthenticated),
        // Open/WEP 在 prepare 即置位安全完成，关联尚未发生
        SEC => Err(WhdError::NotAuthenticated),
        x if x == (A | L | SEC) => Err(WhdError::JoinInProgress),
        x if x == (A | L) || x == (A | L | S) => Err(WhdError::NotKeyed),
        _ => Err(WhdError::InvalidJoinStatus),
    }
}

impl WhdDriver {
    pub(crate) fn check_join_status(&self, bsscfgidx: u8) -> WhdResult<()> {
        if bsscfgidx as usize >= WHD_INTERFACE_MAX {
            return Err(WhdError::InvalidJoinStatus);
        }
        classify_join_status(self.internal.join_status[bsscfgidx as usize].load(Ordering::Acquire))
    }
}

/// join 事件处理器（对应 whd_wifi_join_events_handler）：翻 JoinStatus 位，
/// 终态时经 active-join 互斥释放 join 信号量唤醒等待方。
fn join_events_handler(
    driver: &Arc<WhdDriver>,
    ifp: &Arc<WhdInterface>,
    semaphore: Arc<dyn Semaphore>,
) -> EventHandler {
    let weak = Arc::downgrade(driver);
    let ifp = ifp.clone();
    Box::new(move |header: &EventHeader, data: &[u8]| {
        let driver = match weak.upgrade() {
            Some(d) => d,
            None => return,
        };
        if header.bsscfgidx as usize >= WHD_INTERFACE_MAX {
            log::debug!(target: "whd::join", "event_header: bad interface");
            return;
        }
        let status = &driver.internal.join_status[header.bsscfgidx as usize];
        let mut join_attempt_complete = false;

        match header.event_type {
            WLC_E_PSK_SUP => {
                // 链路未就绪时忽略补充认证事件
                if status.load(Ordering::Acquire) & JOIN_LINK_READY != 0 {
                    if header.status == WLC_SUP_KEYED {
                        // WPA 密钥交换成功
                        let cur = status.load(Ordering::Acquire);
                        status.store(
                            (cur & !JOIN_SECURITY_FLAGS_MASK) | JOIN_SECURITY_COMPLETE,
                            Ordering::Release,
                        );
                    } else {
                        join_attempt_complete = true;
                        if header.status == WLC_SUP_KEYXCHANGE_WAIT_M1
                            && header.reason == WLC_E_SUP_WPA_PSK_TMO
                        {
                            // M1 超时常见于小区边缘或 AP 响应慢
                            log::debug!(target: "whd::join", "supplicant M1 timeout event");
                            status.fetch_or(JOIN_EAPOL_KEY_M1_TIMEOUT, Ordering::AcqRel);
                        } else if header.status == WLC_SUP_KEYXCHANGE_WAIT_M3
                            && header.reason == WLC_E_SUP_WPA_PSK_TMO
                        {
                            // M3 超时往往意味着口令不对
                            log::debug!(target: "whd::join", "supplicant M3 timeout event");
                            status.fetch_or(JOIN_EAPOL_KEY_M3_TIMEOUT, Ordering::AcqRel);
                        } else if header.status == WLC_SUP_KEYXCHANGE_WAIT_G1
                            && header.reason == WLC_E_SUP_WPA_PSK_TMO
                        {
                            log::debug!(target: "whd::join", "supplicant G1 timeout event");
                            status.fetch_or(JOIN_EAPOL_KEY_G1_TIMEOUT, Ordering::AcqRel);
                        } else {
                            log::debug!(
                                target: "whd::join",
                                "unsuccessful supplicant event, status=0x{:x}",
                                header.status
                            );
                            status.fetch_or(JOIN_EAPOL_KEY_FAILURE, Ordering::AcqRel);
                        }
                    }
                }
            }
            WLC_E_SET_SSID => {
                if header.status == WLC_E_STATUS_SUCCESS {
                    status.fetch_or(JOIN_SSID_SET, Ordering::AcqRel);
                } else if header.status == WLC_E_STATUS_NO_NETWORKS {
                    status.fetch_or(JOIN_NO_NETWORKS, Ordering::AcqRel);
                    // 不就此收场：AP 配置后重启的场景（WPS）固件会重试
                } else {
                    join_attempt_complete = true;
                }
            }
            WLC_E_LINK => {
                if header.flags & WLC_EVENT_MSG_LINK != 0 {
                    status.fetch_or(JOIN_LINK_READY, Ordering::AcqRel);
                } else {
                    status.fetch_and(!JOIN_LINK_READY, Ordering::AcqRel);
                }
            }
            WLC_E_DEAUTH_IND | WLC_E_DISASSOC_IND => {
                status.fetch_and(!(JOIN_AUTHENTICATED | JOIN_LINK_READY), Ordering::AcqRel);
            }
            WLC_E_AUTH => {
                if header.status == WLC_E_STATUS_SUCCESS {
                    status.fetch_or(JOIN_AUTHENTICATED, Ordering::AcqRel);
                } else if header.status == WLC_E_STATUS_UNSOLICITED {
                    log::debug!(target: "whd::join", "ignore UNSOLICITED auth event");
                } else {
                    // 认证不了：可能被拒或在小区边缘
                    join_attempt_complete = true;
                }
            }
            WLC_E_CSA_COMPLETE_IND => {
                if data.len() >= wire::WL_CHAN_SWITCH_SIZE {
                    if let Ok(csa) = wire::ChanSwitch::decode(data) {
                        log::info!(target: "whd::join", "CSA event => chan {}", csa.chspec & 0xFF);
                    }
                }
            }
            _ => {}
        }

        if ifp.is_ready_to_transceive().is_ok() {
            join_attempt_complete = true;
        }

        if join_attempt_complete {
            driver.internal.active_join_mutex.acquire(NEVER_TIMEOUT);
            if let Some(active) = driver.internal.active_join_sem.lock().as_ref() {
                if !Arc::ptr_eq(active, &semaphore) {
                    log::error!(target: "whd::join", "unexpected active join semaphore");
                }
                active.release();
            }
            driver.internal.active_join_mutex.release();
        }
    })
}

impl WhdDriver {
    /// join 发射前的准备（对应 whd_wifi_prepare_join）：逐条编排安全
    /// 上下文并注册 join 事件处理器。
    fn prepare_join(
        self: &Arc<Self>,
        ifp: &Arc<WhdInterface>,
        auth_type: Security,
        security_key: &[u8],
        semaphore: &Arc<dyn Semaphore>,
    ) -> WhdResult<()> {
        let chip_id = self.wlan.chip_id();

        if chip_id == 43022
            && matches!(
                auth_type,
                Security::WPA_TKIP_PSK
                    | Security::WPA_AES_PSK
                    | Security::WPA_MIXED_PSK
                    | Security::WPA2_TKIP_PSK
                    | Security::WPA_TKIP_ENT
                    | Security::WPA_AES_ENT
                    | Security::WPA_MIXED_ENT
                    | Security::WPA2_TKIP_ENT
            )
        {
            log::error!(target: "whd::join", "WPA and TKIP are not supported on 43022");
            return Err(WhdError::Unsupported);
        }
        if matches!(
            auth_type,
            Security::WPA2_FBT_ENT | Security::IBSS_OPEN | Security::WPA2_FBT_PSK
        ) {
            return Err(WhdError::UnknownSecurityType);
        }
        if auth_type.contains(WEP_ENABLED) {
            return Err(WhdError::WepNotAllowed);
        }
        let psk_family = matches!(
            auth_type,
            Security::WPA_TKIP_PSK
                | Security::WPA_AES_PSK
                | Security::WPA2_AES_PSK
                | Security::WPA2_AES_PSK_SHA256
                | Security::WPA2_TKIP_PSK
                | Security::WPA2_MIXED_PSK
        );
        let sae_family =
            matches!(auth_type, Security::WPA3_SAE | Security::WPA3_WPA2_PSK);
        if (psk_family
            && (security_key.len() < WSEC_MIN_PSK_LEN || security_key.len() > WSEC_MAX_PSK_LEN))
            || (sae_family && security_key.len() > WSEC_MAX_SAE_PASSWORD_LEN)
        {
            return Err(WhdError::InvalidKey);
        }

        // 清零本接口的 join 状态
        self.internal.join_status[ifp.bsscfgidx as usize].store(0, Ordering::Release);

        // 旧分支里设 wsec 会覆写 MFP，先存现值（开放网络不必）
        let mut auth_mfp = WL_MFP_NONE;
        if auth_type != Security::OPEN {
            auth_mfp = ifp.get_iovar_value(cdc::IOVAR_STR_MFP)?;
        }

        // 无线安全类型
        ifp.set_ioctl_value(cdc::WLC_SET_WSEC, auth_type.wsec())?;
        // 默认开固件漫游
        ifp.set_iovar_value(cdc::IOVAR_STR_ROAM_OFF, 0)?;

        // 43022 的 GTKOE 需要显式编排 bss 级 wpa_auth / wsec 并置组播
        // 密钥轮换唤醒位
        if chip_id == 43022 {
            let wpa = if auth_type == Security::WPA_TKIP_PSK {
                WPA_AUTH_PSK
            } else {
                WPA2_AUTH_PSK
            };
            crate::api::set_bsscfg_iovar_value(self, ifp, cdc::IOVAR_STR_WPA_AUTH, wpa)?;
            crate::api::set_bsscfg_iovar_value(self, ifp, cdc::IOVAR_STR_WSEC, auth_type.wsec())?;
            ifp.configure_wowl(WL_WOWL_KEYROT)?;
        }

        // mfg 固件不带这些 IOVAR，失败不关心
        let _ = crate::api::set_bsscfg_iovar_value(
            self,
            ifp,
            cdc::IOVAR_STR_SUP_WPA,
            auth_type.is_wpa_family() as u32,
        );
        // EAPOL 版本跟随 AP（-1）
        let _ = crate::api::set_bsscfg_iovar_value(
            self,
            ifp,
            cdc::IOVAR_STR_SUP_WPA2_EAPVER,
            -1i32 as u32,
        );

        match auth_type {
            Security::OPEN | Security::WPS_SECURE => {}
            x if psk_family
                || x == Security::WPA_MIXED_PSK
                || x == Security::WPA2_WPA_AES_PSK
                || x == Security::WPA2_WPA_MIXED_PSK =>
            {
                // 不设超时则固件不上报失败的补充认证事件；IOVAR 不支持则继续
                ifp.set_supplicant_key_timeout(DEFAULT_EAPOL_KEY_PACKET_TIMEOUT)
                    .unsupported_ok()?;
                ifp.set_passphrase(security_key)?;
            }
            Security::WPA3_SAE | Security::WPA3_WPA2_PSK => {
                if auth_type == Security::WPA3_WPA2_PSK {
                    ifp.enable_sup_set_passphrase(security_key, auth_type)?;
                }
                ifp.set_supplicant_key_timeout(DEFAULT_EAPOL_KEY_PACKET_TIMEOUT)
                    .unsupported_ok()?;
                if self.wlan.fwcap_has(FwCap::Sae) {
                    ifp.sae_password(security_key)?;
                } else {
                    // 外部补充认证器限制：漫游期间固件上报 EXT_AUTH_REQ
                    // 时 host 已停外部认证，关固件漫游
                    ifp.set_iovar_value(cdc::IOVAR_STR_ROAM_OFF, 1)?;
                }
            }
            Security::WPA_TKIP_ENT
            | Security::WPA_AES_ENT
            | Security::WPA_MIXED_ENT
            | Security::WPA2_TKIP_ENT
            | Security::WPA2_AES_ENT
            | Security::WPA2_MIXED_ENT => {
                // 企业模式超时设 0 关掉 eapol 定时器
                ifp.set_supplicant_key_timeout(0).unsupported_ok()?;
            }
            _ => {
                log::error!(target: "whd::join", "unsupported security type 0x{:x}", auth_type.0);
                return Err(WhdError::UnknownSecurityType);
            }
        }

        // 基础设施 / IBSS 模式
        ifp.set_ioctl_value(
            cdc::WLC_SET_INFRA,
            if auth_type.contains(IBSS_ENABLED) { 0 } else { 1 },
        )?;

        let auth = if sae_family {
            WL_AUTH_SAE
        } else {
            WL_AUTH_OPEN_SYSTEM
        };
        ifp.set_ioctl_value(cdc::WLC_SET_AUTH, auth)?;

        // PMF 出厂要求：WPA3-SAE 必须 MFP，WPA2 系缺省 MFP-capable
        if auth_type == Security::WPA3_SAE {
            auth_mfp = WL_MFP_REQUIRED;
        } else if auth_type == Security::WPA3_WPA2_PSK || auth_type.contains(WPA2_SECURITY) {
            auth_mfp = WL_MFP_CAPABLE;
        }
        if ifp.set_iovar_value(cdc::IOVAR_STR_MFP, auth_mfp).is_err() {
            log::debug!(target: "whd::join", "older chipsets might not support MFP, ignore");
        }

        // WPA 认证模式
        let wpa_auth = match auth_type {
            Security::OPEN | Security::WPS_SECURE => {
                // 开放网络不需要走完密钥交换
                self.internal.join_status[ifp.bsscfgidx as usize]
                    .fetch_or(JOIN_SECURITY_COMPLETE, Ordering::AcqRel);
                WPA_AUTH_DISABLED
            }
            Security::WPA_TKIP_PSK | Security::WPA_AES_PSK | Security::WPA_MIXED_PSK => {
                WPA_AUTH_PSK
            }
            Security::WPA2_AES_PSK
            | Security::WPA2_TKIP_PSK
            | Security::WPA2_MIXED_PSK
            | Security::WPA2_WPA_AES_PSK
            | Security::WPA2_WPA_MIXED_PSK => WPA2_AUTH_PSK,
            Security::WPA2_AES_PSK_SHA256 => WPA2_AUTH_PSK_SHA256,
            Security::WPA3_SAE | Security::WPA3_WPA2_PSK => WPA3_AUTH_SAE_PSK,
            Security::WPA_TKIP_ENT | Security::WPA_AES_ENT | Security::WPA_MIXED_ENT => {
                WPA_AUTH_UNSPECIFIED
            }
            Security::WPA2_TKIP_ENT | Security::WPA2_AES_ENT | Security::WPA2_MIXED_ENT => {
                WPA2_AUTH_UNSPECIFIED
            }
            _ => {
                log::debug!(target: "whd::join", "unsupported security type");
                WPA_AUTH_DISABLED
            }
        };
        ifp.set_ioctl_value(cdc::WLC_SET_WPA_AUTH, wpa_auth)?;

        // 换新 join 事件处理器
        let old = ifp.event_entry(WHD_JOIN_EVENT_ENTRY);
        if old != WHD_EVENT_NOT_REGISTERED {
            self.deregister_event_handler(old)?;
            ifp.set_event_entry(WHD_JOIN_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        let handler = join_events_handler(self, ifp, semaphore.clone());
        let entry = self.set_event_handler(ifp, &JOIN_EVENTS, handler)?;
        if entry as usize >= WHD_MAX_EVENT_SUBSCRIPTION {
            log::error!(target: "whd::join", "join events registration failed");
            return Err(WhdError::Unfinished);
        }
        ifp.set_event_entry(WHD_JOIN_EVENT_ENTRY, entry);

        Ok(())
    }

    /// 换入本次 join 的信号量并完成 prepare（对应 whd_wifi_active_join_init）
    fn active_join_init(
        self: &Arc<Self>,
        ifp: &Arc<WhdInterface>,
        auth_type: Security,
        security_key: &[u8],
        semaphore: &Arc<dyn Semaphore>,
    ) -> WhdResult<()> {
        self.internal.active_join_mutex.acquire(NEVER_TIMEOUT);
        *self.internal.active_join_sem.lock() = Some(semaphore.clone());
        self.internal.active_join_mutex.release();

        self.prepare_join(ifp, auth_type, security_key, semaphore)
    }

    /// join 善后（对应 whd_wifi_active_join_deinit）：换出信号量、失败时
    /// 角色置 Invalid，并释放 join 全程的补充 wake 引用。
    fn active_join_deinit(&self, ifp: &WhdInterface, result: &WhdResult<()>) {
        self.internal.active_join_mutex.acquire(NEVER_TIMEOUT);
        *self.internal.active_join_sem.lock() = None;
        if let Err(e) = result {
            log::info!(target: "whd::join", "failed join (err {:?})", e);
            ifp.set_role(Role::Invalid);
        }
        self.internal.active_join_mutex.release();

        // join 期间强制芯片常醒，此处放它入睡
        self.wlan.let_sleep();
    }

    /// 阻塞等待 join 终态（对应 whd_wifi_join_wait_for_complete）：
    /// 每轮 1/10 预算的信号量等待 + 状态检查；超时后无条件 leave，
    /// 保证不留半关联状态。
    fn join_wait_for_complete(
        &self,
        ifp: &Arc<WhdInterface>,
        semaphore: &Arc<dyn Semaphore>,
    ) -> WhdResult<()> {
        let start_time = self.rtos.time_ms();
        let mut result;
        loop {
            semaphore.acquire(DEFAULT_JOIN_ATTEMPT_TIMEOUT / 10);
            result = ifp.is_ready_to_transceive();
            if result.is_ok() {
                break;
            }
            let current_time = self.rtos.time_ms();
            if current_time.wrapping_sub(start_time) >= DEFAULT_JOIN_ATTEMPT_TIMEOUT {
                break;
            }
        }
        if let Err(e) = &result {
            ifp.leave()?;
            log::info!(target: "whd::join", "not ready to transceive (err {:?}); left network", e);
        }
        result
    }
}

impl WhdInterface {
    /// 终态查询：AP 看 AP 在位，STA 走 join 状态分类
    /// （对应 whd_wifi_is_ready_to_transceive）
    pub fn is_ready_to_transceive(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        match self.role() {
            Role::Ap => {
                if driver.internal.ap_is_up.load(Ordering::Acquire) {
                    Ok(())
                } else {
                    Err(WhdError::InterfaceNotUp)
                }
            }
            Role::Sta => driver.check_join_status(self.bsscfgidx),
            _ => Err(WhdError::InvalidRole),
        }
    }

    /// 接入指定 SSID（对应 whd_wifi_join）；固件自行扫描挑 BSS
    pub fn join(&self, ssid: &[u8], auth_type: Security, security_key: &[u8]) -> WhdResult<()> {
        let ssid = Ssid::new(ssid)?;
        let driver = self.driver()?;
        let this = driver
            .get_interface(self.bsscfgidx)
            .ok_or(WhdError::InvalidInterface)?;

        // join 期间保持芯片常醒
        driver.wlan.keep_awake()?;
        self.set_role(Role::Sta);

        let join_sema = driver.rtos.semaphore(1, 0);
        let mut result = driver.active_join_init(&this, auth_type, security_key, &join_sema);

        if result.is_ok() {
            let mut params = [0u8; wire::WLC_SSID_SIZE];
            wire::encode_wlc_ssid(&ssid, &mut params);
            result = self.set_ioctl_buffer(cdc::WLC_SET_SSID, &params);

            if result.is_ok() {
                result = driver.join_wait_for_complete(&this, &join_sema);
            }
        }

        driver.active_join_deinit(self, &result);
        result
    }

    /// 接入指定 BSS（对应 whd_wifi_join_specific）：优先 `join` IOVAR
    /// 携带扩展扫描参数与 BSSID，旧固件回退 WLC_SET_SSID。
    pub fn join_specific(&self, ap: &ScanResult<'_>, security_key: &[u8]) -> WhdResult<()> {
        let driver = self.driver()?;

        // 参数检查先于任何总线流量
        if ap.bss_type == BssType::Mesh {
            return Err(WhdError::Unsupported);
        }
        if ap.bss_type == BssType::Adhoc {
            // IBSS 接入不提供
            return Err(WhdError::Unsupported);
        }
        let chanspec = if ap.channel == 0 {
            log::info!(target: "whd::join", "FW will do assoc-scan full channels");
            None
        } else {
            Some(wire::chanspec_for(driver.wlan.consts(), ap.band, ap.channel))
        };
        if ap.bssid.is_null() {
            log::error!(target: "whd::join", "NULL BSSID is not allowed/valid");
            return Err(WhdError::BadArg);
        }
        if ap.bssid.is_broadcast() {
            log::error!(target: "whd::join", "broadcast BSSID is not allowed in join_specific");
            return Err(WhdError::BadArg);
        }
        if ap.ssid.len == 0 || ap.ssid.len as usize > SSID_NAME_SIZE {
            return Err(WhdError::BadSsidLen);
        }

        let this = driver
            .get_interface(self.bsscfgidx)
            .ok_or(WhdError::InvalidInterface)?;
        driver.wlan.keep_awake()?;
        self.set_role(Role::Sta);

        let join_sema = driver.rtos.semaphore(1, 0);
        let mut result = driver.active_join_init(&this, ap.security, security_key, &join_sema);

        if result.is_ok() {
            let mut params = [0u8; wire::WL_EXTJOIN_PARAMS_SIZE];
            wire::encode_extjoin_params(&ap.ssid, &ap.bssid, chanspec, &mut params);
            result = self.set_iovar_buffer(cdc::IOVAR_STR_JOIN, &params);

            // 部分固件（如 4390 代）不带 join IOVAR，用老 IOCTL
            if result == Err(WhdError::WlanUnsupported) {
                let mut params = [0u8; wire::WL_JOIN_PARAMS_SIZE];
                wire::encode_join_params(&ap.ssid, &ap.bssid, chanspec, &mut params);
                result = self.set_ioctl_buffer(cdc::WLC_SET_SSID, &params);
            }

            if result.is_ok() {
                result = driver.join_wait_for_complete(&this, &join_sema);
                if result.is_ok() {
                    let chip_id = driver.wlan.chip_id();
                    if chip_id == 0x4373 || chip_id == 55560 {
                        // 11ac 满吞吐需要调大每 AMPDU 的 MPDU 数
                        result = self.set_iovar_value(cdc::IOVAR_STR_MPDU_PER_AMPDU, 16);
                    }
                }
            } else {
                log::info!(target: "whd::join", "join_specific: association request failed");
            }
        }

        driver.active_join_deinit(self, &result);
        result
    }

    /// 离网（对应 whd_wifi_leave）：注销 join 处理器、下发 Disassoc、
    /// 清状态。与进行中的 join 经 active-join 互斥串行化。
    pub fn leave(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        if self.bsscfgidx as usize >= WHD_INTERFACE_MAX {
            return Err(WhdError::BadArg);
        }

        // 先摘处理器、失效 join 信号量指针（互斥内，不跨命令通道持锁）
        driver.internal.active_join_mutex.acquire(NEVER_TIMEOUT);
        *driver.internal.active_join_sem.lock() = None;
        let entry = self.event_entry(WHD_JOIN_EVENT_ENTRY);
        if entry != WHD_EVENT_NOT_REGISTERED {
            let _ = driver.deregister_event_handler(entry);
            self.set_event_entry(WHD_JOIN_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        driver.internal.active_join_mutex.release();

        if let Err(e) = self.set_ioctl_buffer(cdc::WLC_DISASSOC, &[]) {
            log::debug!(target: "whd::join", "send_ioctl(WLC_DISASSOC) failed: {:?}", e);
        }

        // 这些芯片每次 join 都 init 补充认证器，离网时反初始化
        let chip_id = driver.wlan.chip_id();
        if matches!(chip_id, 43022 | 43907 | 43909 | 54907 | 43012) {
            let _ = crate::api::set_bsscfg_iovar_value(&driver, self, cdc::IOVAR_STR_SUP_WPA, 0);
        }

        driver.internal.join_status[self.bsscfgidx as usize].store(0, Ordering::Release);
        self.set_role(Role::Invalid);
        Ok(())
    }

    // ============================ SAE 外部认证 ============================

    /// 登记外部认证回调并订阅 EXT_AUTH 事件
    /// （对应 whd_wifi_external_auth_request）
    pub fn external_auth_request(&self, callback: AuthCallback) -> WhdResult<()> {
        let driver = self.driver()?;
        let old = self.event_entry(WHD_AUTH_EVENT_ENTRY);
        if old != WHD_EVENT_NOT_REGISTERED {
            driver.deregister_event_handler(old)?;
            self.set_event_entry(WHD_AUTH_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        *driver.internal.auth_callback.lock() = Some(callback);

        let weak = Arc::downgrade(&driver);
        let entry = driver.set_event_handler(
            self,
            &AUTH_EVENTS,
            Box::new(move |header: &EventHeader, data: &[u8]| {
                let driver = match weak.upgrade() {
                    Some(d) => d,
                    None => return,
                };
                let mut cb_guard = driver.internal.auth_callback.lock();
                let cb = match cb_guard.as_mut() {
                    Some(cb) => cb,
                    None => {
                        log::error!(target: "whd::join", "no auth callback set");
                        return;
                    }
                };
                match header.event_type {
                    WLC_E_EXT_AUTH_REQ => {
                        if let Ok(status) = wire::AuthReqStatus::decode(data) {
                            let sae_h2e =
                                driver.internal.last_scan_h2e.load(Ordering::Acquire);
                            cb(AuthEvent::ExtAuthReq { status, sae_h2e });
                        }
                    }
                    WLC_E_EXT_AUTH_FRAME_RX => {
                        if data.len() > WL_RX_MGMT_DATA_SIZE {
                            cb(AuthEvent::ExtAuthFrameRx {
                                frame: &data[WL_RX_MGMT_DATA_SIZE..],
                            });
                        }
                    }
                    _ => {}
                }
            }),
        )?;
        if entry as usize >= WHD_MAX_EVENT_SUBSCRIPTION {
            log::error!(target: "whd::join", "auth events registration failed");
            return Err(WhdError::Unfinished);
        }
        self.set_event_entry(WHD_AUTH_EVENT_ENTRY, entry);
        Ok(())
    }

    /// 对应 whd_wifi_stop_external_auth_request
    pub fn stop_external_auth_request(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        let entry = self.event_entry(WHD_AUTH_EVENT_ENTRY);
        if entry != WHD_EVENT_NOT_REGISTERED {
            driver.deregister_event_handler(entry)?;
            self.set_event_entry(WHD_AUTH_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        *driver.internal.auth_callback.lock() = None;
        Ok(())
    }

    /// 回报外部认证结论（对应 whd_wifi_set_auth_status）
    pub fn set_auth_status(&self, params: &wire::AuthReqStatus) -> WhdResult<()> {
        let mut status = *params;
        // DOT11_SC_SUCCESS 折算固件的 EXTAUTH 结果码
        status.flags = if params.flags == 0 {
            wire::WL_EXTAUTH_SUCCESS
        } else {
            wire::WL_EXTAUTH_FAIL
        };
        let mut buf = [0u8; wire::AUTH_REQ_STATUS_SIZE];
        status.encode(&mut buf);
        self.set_iovar_buffer(cdc::IOVAR_STR_AUTH_STATUS, &buf)
    }

    /// 发送 SAE 认证帧（对应 whd_wifi_send_auth_frame）；固件不要
    /// 802.11 管理帧头
    pub fn send_auth_frame(&self, frame: &[u8]) -> WhdResult<()> {
        if frame.len() <= wire::DOT11_MGMT_HDR_LEN {
            return Err(WhdError::BadArg);
        }
        let body = &frame[wire::DOT11_MGMT_HDR_LEN..];
        let mut buf = alloc::vec![0u8; wire::AUTH_PARAMS_HEADER_SIZE + body.len()];
        wire::encode_auth_frame(wire::MGMT_AUTH_FRAME_DWELL_TIME, body, &mut buf);
        self.set_iovar_buffer(cdc::IOVAR_STR_MGMT_FRAME, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{event_frame, scripted_driver};
    use alloc::vec::Vec;

    fn set_ssid_ok() -> Vec<u8> {
        event_frame(WLC_E_SET_SSID, WLC_E_STATUS_SUCCESS, 0, 0, 0, &[])
    }
    fn link_up() -> Vec<u8> {
        event_frame(WLC_E_LINK, WLC_E_STATUS_SUCCESS, 0, WLC_EVENT_MSG_LINK, 0, &[])
    }
    fn auth_ok() -> Vec<u8> {
        event_frame(WLC_E_AUTH, WLC_E_STATUS_SUCCESS, 0, 0, 0, &[])
    }
    fn psk_sup(status: u32, reason: u32) -> Vec<u8> {
        event_frame(WLC_E_PSK_SUP, status, reason, 0, 0, &[])
    }

    fn infra_ap<'a>(ssid: &str, bssid: Mac, channel: u8) -> ScanResult<'a> {
        ScanResult {
            ssid: Ssid::new(ssid.as_bytes()).unwrap(),
            bssid,
            signal_strength: -40,
            max_data_rate: 0,
            bss_type: BssType::Infrastructure,
            security: Security::WPA2_AES_PSK,
            channel,
            band: Band::Band2_4Ghz,
            ccode: [0; 2],
            flags: 0,
            ies: &[],
        }
    }

    // S1：四事件齐全 → 成功
    #[test]
    fn join_success_with_full_event_sequence() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp.join(b"Net", Security::WPA2_AES_PSK, b"passphrase0")
            .unwrap();
        assert_eq!(ifp.is_ready_to_transceive(), Ok(()));
        assert_eq!(ifp.role(), Role::Sta);
        // join 前后 wake 计数平衡（互锁不变式）
        assert_eq!(driver.wlan.wake_count(), 0);
    }

    // S2：M3 等待超时 → 口令多半不对
    #[test]
    fn join_m3_timeout_reports_wrong_passphrase_kind() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![
                set_ssid_ok(),
                link_up(),
                auth_ok(),
                psk_sup(WLC_SUP_KEYXCHANGE_WAIT_M3, WLC_E_SUP_WPA_PSK_TMO),
            ],
        );
        let err = ifp
            .join(b"Net", Security::WPA2_AES_PSK, b"wrongpass0")
            .unwrap_err();
        assert_eq!(err, WhdError::EapolKeyPacketM3Timeout);
        assert_eq!(ifp.role(), Role::Invalid);
        assert_eq!(driver.wlan.wake_count(), 0);
        // 失败路径保证已尝试离网
        assert!(bus.cmd_was_sent(cdc::WLC_DISASSOC));
    }

    // S3：固件未找到网络 → NetworkNotFound（走整段预算 + 无条件 leave）
    #[test]
    fn join_no_networks() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![event_frame(
                WLC_E_SET_SSID,
                WLC_E_STATUS_NO_NETWORKS,
                0,
                0,
                0,
                &[]
            )],
        );
        let err = ifp.join(b"Missing", Security::OPEN, &[]).unwrap_err();
        assert_eq!(err, WhdError::NetworkNotFound);
        assert!(bus.cmd_was_sent(cdc::WLC_DISASSOC));
        assert_eq!(driver.wlan.wake_count(), 0);
    }

    // S4：M1 等待超时（小区边缘）
    #[test]
    fn join_m1_timeout() {
        let (_driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![
                set_ssid_ok(),
                link_up(),
                auth_ok(),
                psk_sup(WLC_SUP_KEYXCHANGE_WAIT_M1, WLC_E_SUP_WPA_PSK_TMO),
            ],
        );
        let err = ifp
            .join(b"Edge", Security::WPA2_AES_PSK, b"passphrase0")
            .unwrap_err();
        assert_eq!(err, WhdError::EapolKeyPacketM1Timeout);
    }

    // S6：全零 BSSID + 零信道 → 参数错误，且不产生任何总线流量
    #[test]
    fn join_specific_rejects_null_bssid_before_bus_traffic() {
        let (_driver, ifp, bus) = scripted_driver(43012);
        let before = bus.sent_commands().len();
        let ap = infra_ap("X", Mac::default(), 0);
        assert_eq!(ifp.join_specific(&ap, b"passphrase0"), Err(WhdError::BadArg));
        assert_eq!(bus.sent_commands().len(), before);
        let ap = infra_ap("X", Mac::BROADCAST, 0);
        assert_eq!(ifp.join_specific(&ap, b"passphrase0"), Err(WhdError::BadArg));
    }

    #[test]
    fn join_specific_carries_bssid_and_chanspec() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "join",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        let ap = infra_ap("Net", Mac([0xAA; 6]), 6);
        ifp.join_specific(&ap, b"passphrase0").unwrap();
        let sent = bus.sent_commands();
        let join_cmd = sent
            .iter()
            .find(|c| c.iovar.as_deref() == Some("join"))
            .unwrap();
        // extjoin：assoc 段带 BSSID 与单信道 chanspec
        let ap_off = wire::WL_EXTJOIN_PARAMS_SIZE - 16;
        assert_eq!(&join_cmd.payload[ap_off..ap_off + 6], &[0xAA; 6]);
        assert_eq!(cdc::read_u32(&join_cmd.payload, ap_off + 8), 1);
        assert_eq!(driver.wlan.wake_count(), 0);
    }

    // 固件不带 join IOVAR：回退 WLC_SET_SSID
    #[test]
    fn join_specific_falls_back_to_set_ssid_ioctl() {
        let (_driver, ifp, bus) = scripted_driver(43012);
        bus.mark_iovar_unsupported("join");
        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        let ap = infra_ap("Net", Mac([0xAA; 6]), 6);
        ifp.join_specific(&ap, b"passphrase0").unwrap();
        let sent = bus.sent_commands();
        let fallback = sent
            .iter()
            .find(|c| c.cmd == cdc::WLC_SET_SSID && c.set)
            .unwrap();
        assert_eq!(fallback.payload.len(), wire::WL_JOIN_PARAMS_SIZE);
    }

    // join → leave → join：角色回 Invalid 再回到一致终态
    #[test]
    fn join_leave_join_cycle() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp.join(b"Net", Security::WPA2_AES_PSK, b"passphrase0")
            .unwrap();
        assert_eq!(ifp.role(), Role::Sta);

        ifp.leave().unwrap();
        assert_eq!(ifp.role(), Role::Invalid);
        assert_eq!(ifp.is_ready_to_transceive(), Err(WhdError::InvalidRole));
        assert_eq!(
            ifp.event_entry(WHD_JOIN_EVENT_ENTRY),
            WHD_EVENT_NOT_REGISTERED
        );
        // 43012 离网要反初始化补充认证器
        assert!(bus.iovar_was_set("bsscfg:sup_wpa"));

        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp.join(b"Net", Security::WPA2_AES_PSK, b"passphrase0")
            .unwrap();
        assert_eq!(ifp.role(), Role::Sta);
        assert_eq!(driver.wlan.wake_count(), 0);
    }

    // prepare 编排次序：wsec → 凭据 → infra/auth/mfp/wpa_auth → 关联
    #[test]
    fn prepare_join_command_ordering() {
        let (_driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp.join(b"Net", Security::WPA2_AES_PSK, b"passphrase0")
            .unwrap();
        let sent = bus.sent_commands();
        let pos = |pred: &dyn Fn(&crate::testutil::SentCmd) -> bool| {
            sent.iter().position(|c| pred(c)).unwrap()
        };
        let wsec = pos(&|c| c.cmd == cdc::WLC_SET_WSEC);
        let roam = pos(&|c| c.iovar.as_deref() == Some("roam_off"));
        let sup = pos(&|c| c.iovar.as_deref() == Some("bsscfg:sup_wpa"));
        let tmo = pos(&|c| c.iovar.as_deref() == Some("bsscfg:sup_wpa_tmo"));
        let pmk = pos(&|c| c.cmd == cdc::WLC_SET_WSEC_PMK);
        let infra = pos(&|c| c.cmd == cdc::WLC_SET_INFRA);
        let auth = pos(&|c| c.cmd == cdc::WLC_SET_AUTH);
        let wpa_auth = pos(&|c| c.cmd == cdc::WLC_SET_WPA_AUTH);
        let ssid = pos(&|c| c.cmd == cdc::WLC_SET_SSID);
        assert!(wsec < roam && roam < sup && sup < tmo && tmo < pmk);
        assert!(pmk < infra && infra < auth && auth < wpa_auth && wpa_auth < ssid);
        // 取值抽查
        assert_eq!(
            &sent[wsec].payload[..4],
            &Security::WPA2_AES_PSK.wsec().to_le_bytes()
        );
        assert_eq!(&sent[auth].payload[..4], &WL_AUTH_OPEN_SYSTEM.to_le_bytes());
        assert_eq!(&sent[wpa_auth].payload[..4], &WPA2_AUTH_PSK.to_le_bytes());
        assert_eq!(&sent[tmo].payload[4..8], &2500u32.to_le_bytes());
        // WPA2 缺省 MFP-capable
        let mfp = sent
            .iter()
            .find(|c| c.set && c.iovar.as_deref() == Some("mfp"))
            .unwrap();
        assert_eq!(&mfp.payload[..4], &WL_MFP_CAPABLE.to_le_bytes());
    }

    #[test]
    fn tkip_rejected_on_43022() {
        let (_driver, ifp, _bus) = scripted_driver(43022);
        let err = ifp
            .join(b"Net", Security::WPA_TKIP_PSK, b"passphrase0")
            .unwrap_err();
        assert_eq!(err, WhdError::Unsupported);
        assert_eq!(ifp.role(), Role::Invalid);
    }

    #[test]
    fn wep_and_fbt_rejected() {
        let (_driver, ifp, _bus) = scripted_driver(43012);
        assert_eq!(
            ifp.join(b"Net", Security::WEP_PSK, b"passphrase0"),
            Err(WhdError::WepNotAllowed)
        );
        assert_eq!(
            ifp.join(b"Net", Security::WPA2_FBT_PSK, b"passphrase0"),
            Err(WhdError::UnknownSecurityType)
        );
        assert_eq!(
            ifp.join(b"Net", Security::WPA2_AES_PSK, b"short"),
            Err(WhdError::InvalidKey)
        );
    }

    // WPA3：有 sae 能力走 sae_password，没有则关漫游交外部补充认证器
    #[test]
    fn wpa3_path_depends_on_sae_capability() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_iovar_response("cap", b"ap sta sae 11n");
        crate::api::read_fw_capabilities(&driver, &ifp).unwrap();
        bus.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp.join(b"SaeNet", Security::WPA3_SAE, b"sae-password")
            .unwrap();
        assert!(bus.iovar_was_set("sae_password"));
        let sent = bus.sent_commands();
        let auth = sent.iter().find(|c| c.cmd == cdc::WLC_SET_AUTH).unwrap();
        assert_eq!(&auth.payload[..4], &WL_AUTH_SAE.to_le_bytes());
        let mfp = sent
            .iter()
            .find(|c| c.set && c.iovar.as_deref() == Some("mfp"))
            .unwrap();
        assert_eq!(&mfp.payload[..4], &WL_MFP_REQUIRED.to_le_bytes());

        // 无 sae 能力：roam_off 最终为 1
        let (_driver2, ifp2, bus2) = scripted_driver(43012);
        bus2.script_events_on(
            "",
            alloc::vec![set_ssid_ok(), link_up(), auth_ok(), psk_sup(WLC_SUP_KEYED, 0)],
        );
        ifp2.join(b"SaeNet", Security::WPA3_SAE, b"sae-password")
            .unwrap();
        assert!(!bus2.iovar_was_set("sae_password"));
        let sent = bus2.sent_commands();
        let last_roam = sent
            .iter()
            .rev()
            .find(|c| c.iovar.as_deref() == Some("roam_off"))
            .unwrap();
        assert_eq!(&last_roam.payload[..4], &1u32.to_le_bytes());
    }

    // 位集分类器对全定义域完备：每个组合都有唯一结论
    #[test]
    fn join_status_classifier_is_total() {
        for bits in 0u32..(1 << 10) {
            let _ = classify_join_status(bits);
        }
        // 表行抽查
        assert_eq!(
            classify_join_status(JOIN_NO_NETWORKS | JOIN_SECURITY_COMPLETE),
            Err(WhdError::NetworkNotFound)
        );
        assert_eq!(
            classify_join_status(
                JOIN_AUTHENTICATED | JOIN_LINK_READY | JOIN_SSID_SET | JOIN_SECURITY_COMPLETE
            ),
            Ok(())
        );
        assert_eq!(
            classify_join_status(JOIN_AUTHENTICATED | JOIN_LINK_READY),
            Err(WhdError::NotKeyed)
        );
        assert_eq!(
            classify_join_status(JOIN_AUTHENTICATED | JOIN_LINK_READY | JOIN_SSID_SET),
            Err(WhdError::NotKeyed)
        );
        assert_eq!(
            classify_join_status(
                JOIN_AUTHENTICATED | JOIN_LINK_READY | JOIN_SECURITY_COMPLETE
            ),
            Err(WhdError::JoinInProgress)
        );
        assert_eq!(classify_join_status(0), Err(WhdError::NotAuthenticated));
        assert_eq!(
            classify_join_status(JOIN_SECURITY_COMPLETE),
            Err(WhdError::NotAuthenticated)
        );
        assert_eq!(
            classify_join_status(
                JOIN_AUTHENTICATED
                    | JOIN_LINK_READY
                    | JOIN_SSID_SET
                    | JOIN_EAPOL_KEY_M1_TIMEOUT
            ),
            Err(WhdError::EapolKeyPacketM1Timeout)
        );
        assert_eq!(
            classify_join_status(JOIN_ASSOCIATED),
            Err(WhdError::InvalidJoinStatus)
        );
    }

    // 链路中断事件清 LINK_READY / AUTHENTICATED
    #[test]
    fn deauth_clears_link_state() {
        let (driver, ifp, bus) = scripted_driver(43012);
        bus.script_events_on(
            "",
            alloc::vec![
                set_ssid_ok(),
                link_up(),
                auth_ok(),
                psk_sup(WLC_SUP_KEYED, 0),
                event_frame(WLC_E_DEAUTH_IND, WLC_E_STATUS_SUCCESS, 0, 0, 0, &[]),
            ],
        );
        // 终态事件后又收到 DEAUTH_IND：等待方已被唤醒，状态降级
        let _ = ifp.join(b"Net", Security::WPA2_AES_PSK, b"passphrase0");
        let status =
            driver.internal.join_status[0].load(core::sync::atomic::Ordering::Acquire);
        assert_eq!(status & JOIN_LINK_READY, 0);
        assert_eq!(status & JOIN_AUTHENTICATED, 0);
    }

    // 外部认证：EXT_AUTH_REQ / FRAME_RX 透传，set_auth_status 折算结果码
    #[test]
    fn external_auth_flow() {
        let (driver, ifp, bus) = scripted_driver(43012);
        let seen = Arc::new(spin::Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        ifp.external_auth_request(Box::new(move |ev| match ev {
            AuthEvent::ExtAuthReq { status, sae_h2e } => {
                seen_cb.lock().push((status.ssid, sae_h2e));
            }
            AuthEvent::ExtAuthFrameRx { frame } => {
                assert_eq!(frame, b"sae-commit");
            }
        }))
        .unwrap();

        let mut req = [0u8; wire::AUTH_REQ_STATUS_SIZE];
        wire::AuthReqStatus {
            flags: 0,
            peer_mac: Mac([5; 6]),
            ssid: Ssid::new(b"SaeNet").unwrap(),
            pmkid: [0; 16],
        }
        .encode(&mut req);
        driver.process_event_frame(&event_frame(WLC_E_EXT_AUTH_REQ, 0, 0, 0, 0, &req));

        let mut frame_rx = alloc::vec![0u8; WL_RX_MGMT_DATA_SIZE];
        frame_rx.extend_from_slice(b"sae-commit");
        driver
            .process_event_frame(&event_frame(WLC_E_EXT_AUTH_FRAME_RX, 0, 0, 0, 0, &frame_rx));

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].0.as_bytes(), b"SaeNet");

        ifp.set_auth_status(&wire::AuthReqStatus {
            flags: 0,
            peer_mac: Mac([5; 6]),
            ssid: Ssid::new(b"SaeNet").unwrap(),
            pmkid: [0; 16],
        })
        .unwrap();
        let sent = bus.sent_commands();
        let status_cmd = sent
            .iter()
            .find(|c| c.iovar.as_deref() == Some("auth_status"))
            .unwrap();
        assert_eq!(
            cdc::read_u16(&status_cmd.payload, 0),
            wire::WL_EXTAUTH_SUCCESS
        );

        // 注销后不再透传
        ifp.stop_external_auth_request().unwrap();
        driver.process_event_frame(&event_frame(WLC_E_EXT_AUTH_REQ, 0, 0, 0, 0, &req));
        assert_eq!(seen.lock().len(), 1);

        // 认证帧剥 802.11 头下发
        let mut mgmt = alloc::vec![0u8; wire::DOT11_MGMT_HDR_LEN];
        mgmt.extend_from_slice(b"frame-body");
        ifp.send_auth_frame(&mgmt).unwrap();
        let sent = bus.sent_commands();
        let auth_frame = sent
            .iter()
            .find(|c| c.iovar.as_deref() == Some("mgmt_frame"))
            .unwrap();
        assert_eq!(&auth_frame.payload[6..], b"frame-body");
    }
}
