//! host 侧控制面（对应 whd_wifi_api.c 的通用操作与观测接口）
//!
//! IOCTL/IOVAR 便捷封装 + 生命周期（set_up/set_down）+ 观测
//! （MAC/BSSID/RSSI/信道/AP 信息/关联表）+ 省电 + 凭据下发。

use alloc::string::String;
use alloc::vec::Vec;
use chip::{FwCap, Rtos};
use pkt::{BufferPool, Packet};

use crate::cdc::{self, read_u32};
use crate::management::{WhdDriver, WhdInterface, WHD_ICMP_ECHO_REQ_EVENT_ENTRY};
use crate::events::{WLC_E_ICMP_ECHO_REQ, WLC_E_NONE, WHD_EVENT_NOT_REGISTERED};
use crate::result::{WhdError, WhdResult};
use crate::types::*;
use crate::wire;

// ============================ 缓冲申请 ============================

pub(crate) fn ioctl_buffer(driver: &WhdDriver, size: usize) -> WhdResult<Packet> {
    driver
        .pool
        .get_ioctl_buffer(size)
        .ok_or(WhdError::BufferAllocFail)
}

pub(crate) fn iovar_buffer(
    driver: &WhdDriver,
    name: &str,
    size: usize,
) -> WhdResult<(Packet, usize)> {
    if name.len() + 1 + size > cdc::WHD_IOVAR_BUF_MAX {
        return Err(WhdError::BadArg);
    }
    driver
        .pool
        .get_iovar_buffer(name, size)
        .ok_or(WhdError::BufferAllocFail)
}

/// `bsscfg:` 前缀 IOVAR：变量名后接 4 字节小端 bss 下标，再接参数
pub(crate) fn set_bsscfg_iovar_buffer(
    driver: &WhdDriver,
    ifp: &WhdInterface,
    name: &str,
    data: &[u8],
) -> WhdResult<()> {
    let full = alloc::format!("{}{}", cdc::IOVAR_BSSCFG_PREFIX, name);
    let (mut pkt, off) = iovar_buffer(driver, &full, 4 + data.len())?;
    cdc::write_u32(pkt.data_mut(), off, ifp.bsscfgidx as u32);
    pkt.data_mut()[off + 4..off + 4 + data.len()].copy_from_slice(data);
    driver.channel.set_iovar(&driver.wlan, ifp.ifidx, pkt)
}

/// `bsscfg:` 前缀 + 单个 u32 参数（sup_wpa / sup_wpa2_eapver / sup_wpa_tmo 等）
pub(crate) fn set_bsscfg_iovar_value(
    driver: &WhdDriver,
    ifp: &WhdInterface,
    name: &str,
    value: u32,
) -> WhdResult<()> {
    set_bsscfg_iovar_buffer(driver, ifp, name, &value.to_le_bytes())
}

impl WhdInterface {
    // ============================ IOCTL 便捷层 ============================

    pub fn set_ioctl_buffer(&self, cmd: u32, data: &[u8]) -> WhdResult<()> {
        let driver = self.driver()?;
        let mut pkt = ioctl_buffer(&driver, data.len())?;
        pkt.data_mut().copy_from_slice(data);
        driver.channel.set_ioctl(&driver.wlan, self.ifidx, cmd, pkt)
    }

    pub fn set_ioctl_value(&self, cmd: u32, value: u32) -> WhdResult<()> {
        self.set_ioctl_buffer(cmd, &value.to_le_bytes())
    }

    /// GET IOCTL，响应拷入 out，返回实际长度
    pub fn get_ioctl_buffer(&self, cmd: u32, out: &mut [u8]) -> WhdResult<usize> {
        let driver = self.driver()?;
        let pkt = ioctl_buffer(&driver, out.len())?;
        let rx = driver.channel.get_ioctl(&driver.wlan, self.ifidx, cmd, pkt)?;
        let n = rx.len().min(out.len());
        out[..n].copy_from_slice(&rx.data()[..n]);
        Ok(n)
    }

    pub fn get_ioctl_value(&self, cmd: u32) -> WhdResult<u32> {
        let mut buf = [0u8; 4];
        if self.get_ioctl_buffer(cmd, &mut buf)? < 4 {
            return Err(WhdError::PartialResults);
        }
        Ok(u32::from_le_bytes(buf))
    }

    // ============================ IOVAR 便捷层 ============================

    pub fn set_iovar_buffer(&self, name: &str, data: &[u8]) -> WhdResult<()> {
        let driver = self.driver()?;
        let (mut pkt, off) = iovar_buffer(&driver, name, data.len())?;
        pkt.data_mut()[off..off + data.len()].copy_from_slice(data);
        driver.channel.set_iovar(&driver.wlan, self.ifidx, pkt)
    }

    pub fn set_iovar_value(&self, name: &str, value: u32) -> WhdResult<()> {
        self.set_iovar_buffer(name, &value.to_le_bytes())
    }

    pub fn get_iovar_buffer(&self, name: &str, out: &mut [u8]) -> WhdResult<usize> {
        let driver = self.driver()?;
        let (pkt, _) = iovar_buffer(&driver, name, out.len())?;
        let rx = driver.channel.get_iovar(&driver.wlan, self.ifidx, pkt)?;
        let n = rx.len().min(out.len());
        out[..n].copy_from_slice(&rx.data()[..n]);
        Ok(n)
    }

    pub fn get_iovar_value(&self, name: &str) -> WhdResult<u32> {
        let mut buf = [0u8; 4];
        if self.get_iovar_buffer(name, &mut buf)? < 4 {
            return Err(WhdError::PartialResults);
        }
        Ok(u32::from_le_bytes(buf))
    }

    // ============================ 生命周期 ============================

    /// 对应 whd_wifi_set_up：WLC_UP 并打印 MAC / 固件 / CLM 版本
    pub fn set_up(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        if driver.wlan_state() == WlanState::Up {
            log::info!(target: "whd::api", "set_up: already up");
            return Ok(());
        }
        self.set_ioctl_buffer(cdc::WLC_UP, &[])?;

        if let Ok(mac) = self.get_mac_address() {
            log::info!(
                target: "whd::api",
                "WLAN MAC Address : {:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                mac.0[0], mac.0[1], mac.0[2], mac.0[3], mac.0[4], mac.0[5]
            );
            *self.mac.lock() = mac;
        }
        let mut version = [0u8; 200];
        if let Ok(n) = self.get_iovar_buffer(cdc::IOVAR_STR_VERSION, &mut version) {
            if let Ok(s) = core::str::from_utf8(&version[..n]) {
                log::info!(target: "whd::api", "WLAN Firmware    : {}", s.trim_end_matches('\0'));
            }
        }
        if let Ok(n) = self.get_iovar_buffer(cdc::IOVAR_STR_CLMVER, &mut version) {
            if let Ok(s) = core::str::from_utf8(&version[..n]) {
                log::info!(target: "whd::api", "WLAN CLM         : {}", s.trim_end_matches('\0'));
            }
        }
        driver.set_wlan_state(WlanState::Up);
        Ok(())
    }

    /// 对应 whd_wifi_set_down
    pub fn set_down(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        if driver.wlan_state() != WlanState::Up {
            log::info!(target: "whd::api", "set_down: already down");
            return Err(WhdError::InterfaceNotUp);
        }
        self.set_ioctl_buffer(cdc::WLC_DOWN, &[])?;
        driver.set_wlan_state(WlanState::Down);
        Ok(())
    }

    // ============================ 观测 ============================

    pub fn get_mac_address(&self) -> WhdResult<Mac> {
        let mut buf = [0u8; 6];
        self.get_iovar_buffer(cdc::IOVAR_STR_CUR_ETHERADDR, &mut buf)?;
        Ok(Mac(buf))
    }

    /// 当前关联 AP 的 BSSID；STA 未接入时回全零
    pub fn get_bssid(&self) -> WhdResult<Mac> {
        if self.role() != Role::Sta {
            return Err(WhdError::InvalidRole);
        }
        if self.is_ready_to_transceive().is_err() {
            return Ok(Mac::default());
        }
        let mut buf = [0u8; 6];
        self.get_ioctl_buffer(cdc::WLC_GET_BSSID, &mut buf)?;
        Ok(Mac(buf))
    }

    pub fn get_rssi(&self) -> WhdResult<i32> {
        if self.role() != Role::Sta {
            return Err(WhdError::InvalidRole);
        }
        self.get_ioctl_value(cdc::WLC_GET_RSSI).map(|v| v as i32)
    }

    /// AP 角色查询某关联客户端的 RSSI
    pub fn get_ap_client_rssi(&self, client: &Mac) -> WhdResult<i32> {
        if self.role() != Role::Ap {
            return Err(WhdError::InvalidRole);
        }
        let mut buf = [0u8; wire::CLIENT_RSSI_SIZE + 2];
        wire::encode_client_rssi(client, &mut buf);
        let driver = self.driver()?;
        let mut pkt = ioctl_buffer(&driver, buf.len())?;
        pkt.data_mut().copy_from_slice(&buf);
        let rx = driver
            .channel
            .get_ioctl(&driver.wlan, self.ifidx, cdc::WLC_GET_RSSI, pkt)?;
        if rx.len() < 4 {
            return Err(WhdError::PartialResults);
        }
        Ok(read_u32(rx.data(), 0) as i32)
    }

    /// 对应 whd_wifi_get_ap_info：返回原始 wl_bss_info_t 与安全分类。
    /// STA 必须已关联——未关联时没有"当前 AP"可查。
    pub fn get_ap_info(&self) -> WhdResult<(Vec<u8>, Security)> {
        if self.role() == Role::Sta && self.is_ready_to_transceive().is_err() {
            return Err(WhdError::NotAssociated);
        }
        let driver = self.driver()?;
        let mut pkt = ioctl_buffer(&driver, 512)?;
        cdc::write_u32(pkt.data_mut(), 0, 512);
        let rx = driver
            .channel
            .get_ioctl(&driver.wlan, self.ifidx, cdc::WLC_GET_BSS_INFO, pkt)?;
        if rx.len() < 4 {
            return Err(WhdError::PartialResults);
        }
        // 响应前 4 字节为长度回显，bss_info 随后
        let bss_info = rx.data()[4..].to_vec();

        let mut security_value = self.get_ioctl_value(cdc::WLC_GET_WSEC)? & SECURITY_MASK;
        if security_value == WEP_ENABLED {
            if self.get_ioctl_value(cdc::WLC_GET_AUTH)? == SHARED_AUTH {
                security_value |= SHARED_ENABLED;
            }
        } else if security_value & (TKIP_ENABLED | AES_ENABLED) != 0 {
            let wpa_auth = self.get_ioctl_value(cdc::WLC_GET_WPA_AUTH)?;
            if wpa_auth == WPA2_AUTH_PSK {
                security_value |= WPA2_SECURITY;
            } else if wpa_auth == WPA_AUTH_PSK {
                security_value |= WPA_SECURITY;
            }
        } else if security_value != 0 {
            log::error!(target: "whd::api", "unknown security type 0x{:x}", security_value);
            return Err(WhdError::UnknownSecurityType);
        }
        Ok((bss_info, Security(security_value)))
    }

    /// AP 角色下的关联客户端表；接口未 up 时返回空表
    pub fn get_associated_client_list(&self, max_clients: usize) -> WhdResult<Vec<Mac>> {
        match self.is_ready_to_transceive() {
            Ok(()) if self.role() == Role::Ap => {}
            // 未 up 就不可能有关联客户端
            Err(WhdError::InterfaceNotUp) => return Ok(Vec::new()),
            _ => return Err(WhdError::InvalidRole),
        }
        let driver = self.driver()?;
        let buffer_length = 4 + 6 * max_clients;
        let mut pkt = ioctl_buffer(&driver, buffer_length)?;
        pkt.data_mut().fill(0);
        cdc::write_u32(pkt.data_mut(), 0, max_clients as u32);
        let rx = driver
            .channel
            .get_ioctl(&driver.wlan, self.ifidx, cdc::WLC_GET_ASSOCLIST, pkt)?;
        let mut macs = alloc::vec![Mac::default(); max_clients];
        let count = wire::decode_maclist(rx.data(), &mut macs)? as usize;
        macs.truncate(count.min(max_clients));
        Ok(macs)
    }

    /// 当前信道（channel_info.hw_channel）
    pub fn get_channel(&self) -> WhdResult<u32> {
        let mut buf = [0u8; wire::CHANNEL_INFO_SIZE];
        self.get_ioctl_buffer(cdc::WLC_GET_CHANNEL, &mut buf)?;
        wire::decode_channel_info_hw_channel(&buf)
    }

    /// P2P 接口按 group-owner 在位与否折算成 AP / STA 再走信道操作
    fn channel_role(&self, driver: &WhdDriver) -> Role {
        match self.role() {
            Role::P2p => {
                if driver
                    .internal
                    .p2p_go_is_up
                    .load(core::sync::atomic::Ordering::Acquire)
                {
                    Role::Ap
                } else {
                    Role::Sta
                }
            }
            r => r,
        }
    }

    /// 对应 whd_wifi_set_chanspec（STA/AP 经 `chanspec` IOVAR）
    pub fn set_chanspec(&self, chanspec: u16) -> WhdResult<()> {
        let driver = self.driver()?;
        match self.channel_role(&driver) {
            Role::Sta | Role::Ap => self.set_iovar_value(cdc::IOVAR_STR_CHANSPEC, chanspec as u32),
            _ => Err(WhdError::InvalidRole),
        }
    }

    /// 对应 whd_wifi_set_channel：STA 直接切，AP 走 CSA 通告
    pub fn set_channel(&self, channel: u32) -> WhdResult<()> {
        let driver = self.driver()?;
        match self.channel_role(&driver) {
            Role::Sta => self.set_ioctl_value(cdc::WLC_SET_CHANNEL, channel),
            Role::Ap => {
                let consts = driver.wlan.consts();
                let chspec = channel as u16
                    | wire::channel_to_band_bits(consts, channel)
                    | consts.chanspec_bw_20
                    | consts.chanspec_ctl_sb_none;
                let mut buf = [0u8; wire::WL_CHAN_SWITCH_SIZE];
                wire::ChanSwitch {
                    mode: 1,
                    count: 1,
                    chspec,
                    reg: 0,
                    frame_type: 0,
                }
                .encode(&mut buf);
                self.set_iovar_buffer(cdc::IOVAR_STR_CSA, &buf)
            }
            _ => Err(WhdError::InvalidRole),
        }
    }

    // ============================ 省电 ============================

    /// PM1：最大省电
    pub fn enable_powersave(&self) -> WhdResult<()> {
        self.set_ioctl_value(cdc::WLC_SET_PM, PM1_POWERSAVE_MODE)
    }

    /// PM2：吞吐量优先省电；回睡时延向下取整到 10ms 的倍数并校验界
    pub fn enable_powersave_with_throughput(&self, return_to_sleep_ms: u32) -> WhdResult<()> {
        let rounded = (return_to_sleep_ms / 10) * 10;
        if !(PM2_SLEEP_RET_TIME_MIN..=PM2_SLEEP_RET_TIME_MAX).contains(&rounded) {
            return Err(WhdError::BadArg);
        }
        self.set_iovar_value(cdc::IOVAR_STR_PM2_SLEEP_RET, rounded)?;
        self.set_ioctl_value(cdc::WLC_SET_PM, PM2_POWERSAVE_MODE)
    }

    pub fn disable_powersave(&self) -> WhdResult<()> {
        self.set_ioctl_value(cdc::WLC_SET_PM, NO_POWERSAVE_MODE)
    }

    pub fn get_powersave_mode(&self) -> WhdResult<u32> {
        self.get_ioctl_value(cdc::WLC_GET_PM)
    }

    // ============================ 凭据 ============================

    /// 对应 whd_wifi_set_passphrase：wsec_pmk 下发。
    /// 1ms 前置延时：radio 固件就绪窗口，规避间歇性写入失败。
    pub fn set_passphrase(&self, key: &[u8]) -> WhdResult<()> {
        if key.len() < WSEC_MIN_PSK_LEN || key.len() > WSEC_MAX_PSK_LEN {
            return Err(WhdError::BadArg);
        }
        let driver = self.driver()?;
        let mut buf = [0u8; wire::WSEC_PMK_SIZE];
        wire::encode_wsec_pmk(key, wire::WSEC_PASSPHRASE, &mut buf);
        driver.rtos.delay_ms(1);
        self.set_ioctl_buffer(cdc::WLC_SET_WSEC_PMK, &buf)
    }

    /// 对应 whd_wifi_set_pmk：32 字节 PMK 十六进制展开下发，48 字节原样
    pub fn set_pmk(&self, key: &[u8]) -> WhdResult<()> {
        if key.len() != WSEC_PMK_LEN && key.len() != WSEC_PMK_WPA3_ENT_192_LEN {
            return Err(WhdError::BadArg);
        }
        let driver = self.driver()?;
        let mut buf = [0u8; wire::WSEC_PMK_SIZE];
        if key.len() == WSEC_PMK_WPA3_ENT_192_LEN {
            wire::encode_wsec_pmk(key, 0, &mut buf);
        } else {
            const HEX: &[u8; 16] = b"0123456789abcdef";
            let mut expanded = [0u8; WSEC_PMK_LEN * 2];
            for (i, b) in key.iter().enumerate() {
                expanded[2 * i] = HEX[(b >> 4) as usize];
                expanded[2 * i + 1] = HEX[(b & 0xF) as usize];
            }
            wire::encode_wsec_pmk(&expanded, wire::WSEC_PASSPHRASE, &mut buf);
        }
        driver.rtos.delay_ms(1);
        self.set_ioctl_buffer(cdc::WLC_SET_WSEC_PMK, &buf)
    }

    /// 对应 whd_wifi_sae_password
    pub fn sae_password(&self, key: &[u8]) -> WhdResult<()> {
        if key.is_empty() || key.len() > WSEC_MAX_SAE_PASSWORD_LEN {
            return Err(WhdError::BadArg);
        }
        let driver = self.driver()?;
        let mut buf = [0u8; wire::WSEC_SAE_PASSWORD_SIZE];
        wire::encode_sae_password(key, &mut buf);
        driver.rtos.delay_ms(1);
        self.set_iovar_buffer(cdc::IOVAR_STR_SAE_PASSWORD, &buf)
    }

    /// 打开固件补充认证器（mfg 固件缺这些 IOVAR，失败不关心）
    pub fn enable_supplicant(&self, auth_type: Security) -> WhdResult<()> {
        let driver = self.driver()?;
        let enable = auth_type.is_wpa_family() as u32;
        let _ = set_bsscfg_iovar_value(&driver, self, cdc::IOVAR_STR_SUP_WPA, enable);
        Ok(())
    }

    /// EAPOL 密钥包超时（不设则固件不上报失败的补充认证事件）
    pub fn set_supplicant_key_timeout(&self, timeout_ms: i32) -> WhdResult<()> {
        let driver = self.driver()?;
        set_bsscfg_iovar_value(&driver, self, cdc::IOVAR_STR_SUP_WPA_TMO, timeout_ms as u32)
    }

    /// 先开补充认证器再装口令（WPA3 过渡模式用）
    pub fn enable_sup_set_passphrase(&self, key: &[u8], auth_type: Security) -> WhdResult<()> {
        if key.len() < WSEC_MIN_PSK_LEN || key.len() > WSEC_MAX_PSK_LEN {
            return Err(WhdError::InvalidKey);
        }
        self.enable_supplicant(auth_type)?;
        self.set_passphrase(key)
    }

    /// 对应 whd_wifi_set_pmksa：按 BSSID 换入或追加一条 PMKID
    pub fn set_pmksa(&self, pmkid: &wire::Pmkid) -> WhdResult<()> {
        const MAXPMKID: usize = 16;
        let mut buf = alloc::vec![0u8; 4 + MAXPMKID * wire::PMKID_SIZE];
        let n = self.get_iovar_buffer(cdc::IOVAR_STR_PMKID_INFO, &mut buf)?;
        let mut list = wire::decode_pmkid_list(&buf[..n]).unwrap_or_default();
        match list.iter_mut().find(|p| p.bssid == pmkid.bssid) {
            Some(slot) => *slot = *pmkid,
            None => {
                if list.len() >= MAXPMKID {
                    return Err(WhdError::NoResourcesForPmkidCache);
                }
                list.push(*pmkid);
            }
        }
        let mut out = alloc::vec![0u8; 4 + list.len() * wire::PMKID_SIZE];
        wire::encode_pmkid_list(&list, &mut out);
        self.set_iovar_buffer(cdc::IOVAR_STR_PMKID_INFO, &out)
    }

    // ============================ 杂项配置 ============================

    /// 对应 whd_wifi_set_country_code
    pub fn set_country_code(&self, ccode: [u8; 2], rev: i32) -> WhdResult<()> {
        let mut buf = [0u8; wire::WL_COUNTRY_SIZE];
        wire::encode_country(ccode, rev, &mut buf);
        self.set_iovar_buffer(cdc::IOVAR_STR_COUNTRY, &buf)
    }

    /// 对应 whd_configure_wowl：读-改-写 wowl / wowl_os
    pub fn configure_wowl(&self, set_wowl: u32) -> WhdResult<()> {
        let current = self.get_iovar_value(cdc::IOVAR_STR_WOWL)?;
        let merged = set_wowl | current;
        self.set_iovar_value(cdc::IOVAR_STR_WOWL, merged)?;
        self.set_iovar_value(cdc::IOVAR_STR_WOWL_OS, merged)
    }

    /// 对应 whd_set_wsec_info_algos：xtlv 编码下发 bss 算法集
    pub fn set_wsec_info_algos(&self, algos: u32, mask: u32) -> WhdResult<()> {
        let mut buf = [0u8; 16];
        let n = wire::encode_wsec_info_algos(algos, mask, &mut buf);
        self.set_iovar_buffer(cdc::IOVAR_STR_WSEC_INFO, &buf[..n])
    }

    pub fn get_fwcap(&self) -> WhdResult<u32> {
        Ok(self.driver()?.wlan.fwcap())
    }

    /// 读取固件控制台增量（对应 whd_wifi_read_wlan_log）：按芯片 RAM 布局
    /// 取 wlan_shared 末字地址，经背板追控制台环形缓冲的写指针。
    /// 背板窗口期间由 chip 层持 wake 引用。
    pub fn read_wlan_log(&self, out: &mut [u8]) -> WhdResult<usize> {
        let driver = self.driver()?;
        let shared_addr = driver.wlan.wlan_shared_address();
        Ok(driver.wlan.read_console_log(shared_addr, out)?)
    }

    // ============================ ICMP echo-req 事件 ============================

    /// 注册 ICMP echo-req 事件回调（ping 遥测透传）
    pub fn register_icmp_echo_req_handler(
        &self,
        callback: crate::management::IcmpEchoReqCallback,
    ) -> WhdResult<()> {
        let driver = self.driver()?;
        let existing = self.event_entry(WHD_ICMP_ECHO_REQ_EVENT_ENTRY);
        if existing != WHD_EVENT_NOT_REGISTERED {
            driver.deregister_event_handler(existing)?;
            self.set_event_entry(WHD_ICMP_ECHO_REQ_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        *driver.internal.icmp_echo_req_callback.lock() = Some(callback);
        let weak = alloc::sync::Arc::downgrade(&driver);
        let entry = driver.set_event_handler(
            self,
            &[WLC_E_ICMP_ECHO_REQ, WLC_E_NONE],
            alloc::boxed::Box::new(move |header, data| {
                if let Some(d) = weak.upgrade() {
                    if let Some(cb) = d.internal.icmp_echo_req_callback.lock().as_mut() {
                        cb(header, data);
                    }
                }
            }),
        )?;
        self.set_event_entry(WHD_ICMP_ECHO_REQ_EVENT_ENTRY, entry);
        Ok(())
    }

    pub fn unregister_icmp_echo_req_handler(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        let entry = self.event_entry(WHD_ICMP_ECHO_REQ_EVENT_ENTRY);
        if entry != WHD_EVENT_NOT_REGISTERED {
            driver.deregister_event_handler(entry)?;
            self.set_event_entry(WHD_ICMP_ECHO_REQ_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        *driver.internal.icmp_echo_req_callback.lock() = None;
        Ok(())
    }
}

/// 读取固件能力串（`cap` IOVAR）写入 fwcap 集合（对应 whd_wifi_read_fw_capabilities）
pub(crate) fn read_fw_capabilities(driver: &WhdDriver, ifp: &WhdInterface) -> WhdResult<()> {
    const MAX_CAPS_BUFFER_SIZE: usize = 768;
    let mut caps = alloc::vec![0u8; MAX_CAPS_BUFFER_SIZE];
    let n = ifp.get_iovar_buffer(cdc::IOVAR_STR_CAP, &mut caps)?;
    let caps = String::from_utf8_lossy(&caps[..n]);
    let mut flags = 0u32;
    for (name, cap) in [
        ("sae_ext", FwCap::SaeExt),
        ("sae", FwCap::Sae),
        ("fbt", FwCap::Fbt),
        ("mfp", FwCap::Mfp),
        ("offloads", FwCap::Offloads),
        ("gcmp", FwCap::GcmpConfig),
    ] {
        if caps.contains(name) {
            flags |= 1 << cap as u32;
        }
    }
    driver.wlan.fwcap_set(flags);
    Ok(())
}
