//! 扫描引擎（C5 的扫描侧）
//!
//! 对应 whd_wifi_api.c whd_wifi_scan / whd_wifi_stop_scan / whd_wifi_scan_synch
//! 与 whd_wifi_scan_events_handler：host 下发 `escan` IOVAR，固件以
//! WLC_E_ESCAN_RESULT 事件流式回部分结果，每条事件恰含一条 wl_bss_info_t。
//! 分发器解析 IE 得出安全位集、HT 速率、国家码后回调用户。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use chip::{ChipConst, Rtos, Semaphore};

use crate::cdc::{self, read_u16};
use crate::events::*;
use crate::ie;
use crate::management::{WhdDriver, WhdInterface, WHD_SCAN_EVENT_ENTRY};
use crate::result::{WhdError, WhdResult};
use crate::types::*;
use crate::wire;

/// 扫描回调状态（对应 whd_scan_status_t）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Incomplete,
    CompletedSuccessfully,
    Aborted,
}

/// 扫描回调：部分结果为 Some(record)，终态为 None + 状态
pub type ScanCallback = Box<dyn FnMut(Option<&ScanResult<'_>>, ScanStatus) + Send>;

/// scan_synchronous 的落盘条目（不含借用 IE）
#[derive(Debug, Clone, Copy)]
pub struct SyncScanResult {
    pub ssid: Ssid,
    pub bssid: Mac,
    pub security: Security,
    pub signal_strength: i16,
    pub max_data_rate: u32,
    pub channel: u8,
    pub band: Band,
}

// 套件类型低字节（RSN/WPA suite selector 第 4 字节）
const WHD_CIPHER_TKIP: u8 = 2;
const WHD_CIPHER_CCMP_128: u8 = 4;
const WHD_AKM_8021X: u8 = 1;
const WHD_AKM_PSK: u8 = 2;
const WHD_AKM_FT_8021X: u8 = 3;
const WHD_AKM_FT_PSK: u8 = 4;
const WHD_AKM_PSK_SHA256: u8 = 6;
const WHD_AKM_SAE_SHA256: u8 = 8;

/// RSNX H2E 能力位（第一个能力字节的 bit 5）
const DOT11_RSNX_SAE_H2E: u8 = 5;
const DOT11_RSNX_CAP_LEN: usize = 1;

const HT_CAPABILITIES_IE_LENGTH: usize = 26;
const HT_CAPABILITIES_INFO_SUPPORTED_CHANNEL_WIDTH_SET: u16 = 0x0002;
const HT_CAPABILITIES_INFO_SHORT_GI_FOR_20MHZ: u16 = 0x0020;
const HT_CAPABILITIES_INFO_SHORT_GI_FOR_40MHZ: u16 = 0x0040;
const COUNTRY_INFO_IE_MINIMUM_LENGTH: usize = 6;

/// 11n MCS → 速率表，单位 100 kbit/s。
/// 维度：[MCS 位] [40MHz 支持] [短 GI]
#[rustfmt::skip]
const MCS_DATA_RATE_LOOKUP_TABLE: [[[u16; 2]; 2]; 32] = [
    [[65, 72], [135, 150]],
    [[130, 144], [270, 300]],
    [[195, 217], [405, 450]],
    [[260, 289], [540, 600]],
    [[390, 433], [810, 900]],
    [[520, 578], [1080, 1200]],
    [[585, 650], [1215, 1350]],
    [[650, 722], [1350, 1500]],
    [[130, 144], [270, 300]],
    [[260, 289], [540, 600]],
    [[390, 433], [810, 900]],
    [[520, 578], [1080, 1200]],
    [[780, 867], [1620, 1800]],
    [[1040, 1156], [2160, 2400]],
    [[1170, 1300], [2430, 2700]],
    [[1300, 1444], [2700, 3000]],
    [[195, 217], [405, 450]],
    [[390, 433], [810, 900]],
    [[585, 650], [1215, 1350]],
    [[780, 867], [1620, 1800]],
    [[1170, 1300], [2430, 2700]],
    [[1560, 1733], [3240, 3600]],
    [[1755, 1950], [3645, 4050]],
    [[1950, 2167], [4050, 4500]],
    [[260, 288], [540, 600]],
    [[520, 576], [1080, 1200]],
    [[780, 868], [1620, 1800]],
    [[1040, 1156], [2160, 2400]],
    [[1560, 1732], [3240, 3600]],
    [[2080, 2312], [4320, 4800]],
    [[2340, 2600], [4860, 5400]],
    [[2600, 2888], [5400, 6000]],
];

/// RSN IE 的 AKM/密码套件 → 安全位集
fn parse_rsn_ie(data: &[u8], security: &mut u32) -> bool {
    // version(2) + group(4) + pairwise_count(2)
    if data.len() < 8 {
        return false;
    }
    let pairwise_count = read_u16(data, 6) as usize;
    let akm_off = 8 + pairwise_count * 4;
    if data.len() < akm_off + 2 {
        return false;
    }
    let akm_count = read_u16(data, akm_off) as usize;
    if data.len() < akm_off + 2 + akm_count * 4 {
        return false;
    }

    for a in 0..akm_count {
        match data[akm_off + 2 + a * 4 + 3] {
            WHD_AKM_PSK => *security |= WPA2_SECURITY,
            WHD_AKM_PSK_SHA256 => *security |= WPA2_SECURITY | WPA2_SHA256_SECURITY,
            WHD_AKM_SAE_SHA256 => *security |= WPA3_SECURITY,
            WHD_AKM_8021X => *security |= WPA2_SECURITY | ENTERPRISE_ENABLED,
            WHD_AKM_FT_8021X => *security |= WPA2_SECURITY | FBT_ENABLED | ENTERPRISE_ENABLED,
            WHD_AKM_FT_PSK => *security |= WPA2_SECURITY | FBT_ENABLED,
            _ => {}
        }
    }
    // 组播/单播套件出现 TKIP 即混合模式
    match data[5] {
        WHD_CIPHER_TKIP => *security |= TKIP_ENABLED,
        WHD_CIPHER_CCMP_128 => *security |= AES_ENABLED,
        _ => {}
    }
    for p in 0..pairwise_count {
        match data[8 + p * 4 + 3] {
            WHD_CIPHER_TKIP => *security |= TKIP_ENABLED,
            WHD_CIPHER_CCMP_128 => *security |= AES_ENABLED,
            _ => {}
        }
    }
    true
}

/// WPA vendor IE（OUI 头之后）→ 安全位集
fn parse_wpa_ie(data: &[u8], security: &mut u32) -> bool {
    // version(2) + multicast(4) + unicast_count(2)
    if data.len() < 8 {
        return false;
    }
    *security |= WPA_SECURITY;
    match data[5] {
        WHD_CIPHER_TKIP => *security |= TKIP_ENABLED,
        WHD_CIPHER_CCMP_128 => *security |= AES_ENABLED,
        _ => {}
    }
    let unicast_count = read_u16(data, 6) as usize;
    let akm_off = 8 + unicast_count * 4;
    if data.len() >= akm_off + 2 {
        let akm_count = read_u16(data, akm_off) as usize;
        if data.len() >= akm_off + 2 + akm_count * 4 {
            for a in 0..akm_count {
                if data[akm_off + 2 + a * 4 + 3] == WHD_AKM_8021X {
                    *security |= ENTERPRISE_ENABLED;
                }
            }
        }
    }
    for u in 0..unicast_count {
        if 8 + u * 4 + 4 <= data.len() && data[8 + u * 4 + 3] == WHD_CIPHER_CCMP_128 {
            *security |= AES_ENABLED;
        }
    }
    true
}

/// 由 IE 区 + 能力位判定网络安全（§RSN → WPA → WEP → Open 次序）
pub(crate) fn parse_security(ies: &[u8], capability: u16) -> Security {
    let mut security = 0u32;
    let rsn = ie::find_tlv(ies, ie::DOT11_IE_ID_RSN);
    let parsed = match rsn {
        Some(data) => parse_rsn_ie(data, &mut security),
        None => match ie::find_wpa_ie(ies) {
            Some(data) => parse_wpa_ie(data, &mut security),
            None => false,
        },
    };
    if !parsed {
        if capability & wire::DOT11_CAP_PRIVACY != 0 {
            return Security::WEP_PSK;
        }
        return Security::OPEN;
    }
    Security(security)
}

/// 把一条 wl_bss_info_t 整理成扫描记录
pub(crate) fn build_scan_record<'a>(
    consts: &ChipConst,
    bss: &wire::WlBssInfo<'a>,
) -> ScanResult<'a> {
    let mut flags = 0u8;
    if bss.flags & wire::WL_BSS_FLAGS_RSSI_ONCHANNEL == 0 {
        // DSSS 速率信标可能在邻信道被收到，默认整条丢弃
        flags |= SCAN_RESULT_FLAG_RSSI_OFF_CHANNEL;
    }
    if bss.flags & wire::WL_BSS_FLAGS_FROM_BEACON != 0 {
        flags |= SCAN_RESULT_FLAG_BEACON;
    }

    let mut max_data_rate = 0u32;
    for rate in bss.rates {
        max_data_rate = max_data_rate.max(wire::rspec_to_kbps(*rate));
    }

    let bss_type = if bss.capability & wire::DOT11_CAP_ESS != 0 {
        BssType::Infrastructure
    } else if bss.capability & wire::DOT11_CAP_IBSS != 0 {
        BssType::Adhoc
    } else {
        BssType::Unknown
    };

    let mut security = parse_security(bss.ies, bss.capability);
    if security == Security::OPEN && bss.capability & wire::DOT11_CAP_PRIVACY != 0 {
        security = Security::WEP_PSK;
    }

    if let Some(rsnx) = ie::find_tlv(bss.ies, ie::DOT11_IE_ID_RSNX) {
        if rsnx.len() == DOT11_RSNX_CAP_LEN && rsnx[0] & (1 << DOT11_RSNX_SAE_H2E) != 0 {
            flags |= SCAN_RESULT_FLAG_SAE_H2E;
        }
    }

    // HT 能力：最高 MCS 位 + 20/40 + 短 GI 决定 11n 速率上限
    if let Some(ht) = ie::find_tlv(bss.ies, ie::DOT11_IE_ID_HT_CAPABILITIES) {
        if ht.len() == HT_CAPABILITIES_IE_LENGTH {
            let info = read_u16(ht, 0);
            let supports_40mhz =
                (info & HT_CAPABILITIES_INFO_SUPPORTED_CHANNEL_WIDTH_SET != 0) as usize;
            let short_gi = [
                (info & HT_CAPABILITIES_INFO_SHORT_GI_FOR_20MHZ != 0) as usize,
                (info & HT_CAPABILITIES_INFO_SHORT_GI_FOR_40MHZ != 0) as usize,
            ];
            let mcs = &ht[3..19];
            for a in (0..32).rev() {
                if mcs[a / 8] & (1 << (a % 8)) != 0 {
                    max_data_rate = 100
                        * MCS_DATA_RATE_LOOKUP_TABLE[a][supports_40mhz][short_gi[supports_40mhz]]
                            as u32;
                    break;
                }
            }
        }
    }

    let band = wire::chanspec_band(consts, bss.chanspec);
    // n/HT 之后 chanspec 报中心频点，控制信道取 ctl_ch
    let channel = if band == Band::Band6Ghz || bss.n_cap {
        bss.ctl_ch
    } else {
        wire::chanspec_channel(consts, bss.chanspec)
    };

    let mut ccode = [0u8; 2];
    if let Some(country) = ie::find_tlv(bss.ies, ie::DOT11_IE_ID_COUNTRY) {
        if country.len() >= COUNTRY_INFO_IE_MINIMUM_LENGTH - 2 {
            ccode[0] = country[0] & 0x7F;
            ccode[1] = country[1] & 0x7F;
        }
    }

    ScanResult {
        ssid: bss.ssid,
        bssid: bss.bssid,
        signal_strength: bss.rssi,
        max_data_rate,
        bss_type,
        security,
        channel,
        band,
        ccode,
        flags,
        ies: bss.ies,
    }
}

/// 扫描事件处理器（对应 whd_wifi_scan_events_handler）
pub(crate) fn scan_events_handler(
    driver: &Arc<WhdDriver>,
    ifp: &Arc<WhdInterface>,
) -> crate::events::EventHandler {
    let weak = Arc::downgrade(driver);
    let ifp = ifp.clone();
    Box::new(move |header: &EventHeader, data: &[u8]| {
        let driver = match weak.upgrade() {
            Some(d) => d,
            None => return,
        };
        match header.status {
            WLC_E_STATUS_SUCCESS => {
                finish_scan(&driver, &ifp, ScanStatus::CompletedSuccessfully);
            }
            WLC_E_STATUS_NEWSCAN | WLC_E_STATUS_NEWASSOC | WLC_E_STATUS_ABORT => {
                finish_scan(&driver, &ifp, ScanStatus::Aborted);
            }
            WLC_E_STATUS_PARTIAL => {
                partial_scan_result(&driver, data);
            }
            _ => {}
        }
    })
}

fn finish_scan(driver: &Arc<WhdDriver>, ifp: &Arc<WhdInterface>, status: ScanStatus) {
    let callback = driver.internal.scan_callback.lock().take();
    if let Some(mut cb) = callback {
        cb(None, status);
    }
    let entry = ifp.event_entry(WHD_SCAN_EVENT_ENTRY);
    if entry != WHD_EVENT_NOT_REGISTERED {
        let _ = driver.deregister_event_handler(entry);
        ifp.set_event_entry(WHD_SCAN_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
    }
}

fn partial_scan_result(driver: &Arc<WhdDriver>, data: &[u8]) {
    let eresult = match wire::decode_escan_result(data) {
        Ok(r) => r,
        Err(_) => return,
    };
    // 每条事件恰一条 BSS 记录
    if eresult.bss_count != 1 {
        return;
    }
    let bss = match wire::decode_bss_info(eresult.bss_info) {
        Ok(b) => b,
        Err(_) => return,
    };
    if !ie::validate(bss.ies) {
        log::debug!(target: "whd::scan", "malformed IE section, record dropped");
        return;
    }
    let record = build_scan_record(driver.wlan.consts(), &bss);
    if record.flags & SCAN_RESULT_FLAG_RSSI_OFF_CHANNEL != 0 {
        return;
    }
    driver.internal.last_scan_h2e.store(
        record.flags & SCAN_RESULT_FLAG_SAE_H2E != 0,
        core::sync::atomic::Ordering::Release,
    );
    // 回调期间不持扫描状态锁（回调可能重入 scan/stop_scan）
    let callback = driver.internal.scan_callback.lock().take();
    if let Some(mut cb) = callback {
        cb(Some(&record), ScanStatus::Incomplete);
        let mut slot = driver.internal.scan_callback.lock();
        if slot.is_none() {
            *slot = Some(cb);
        }
    }
}

impl WhdInterface {
    /// 发起增量扫描（对应 whd_wifi_scan）。固件以事件流回结果，
    /// 回调运行在驱动工作线程上。
    pub fn scan(
        &self,
        scan_type: ScanType,
        bss_type: BssType,
        optional_ssid: Option<&Ssid>,
        optional_mac: Option<&Mac>,
        optional_channel_list: Option<&[u16]>,
        optional_extended_params: Option<&ScanExtendedParams>,
        callback: ScanCallback,
    ) -> WhdResult<()> {
        if !matches!(
            bss_type,
            BssType::Infrastructure | BssType::Adhoc | BssType::Any
        ) {
            return Err(WhdError::BadArg);
        }
        let driver = self.driver()?;

        let old = self.event_entry(WHD_SCAN_EVENT_ENTRY);
        if old != WHD_EVENT_NOT_REGISTERED {
            driver.deregister_event_handler(old)?;
            self.set_event_entry(WHD_SCAN_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
        }
        let this = driver
            .get_interface(self.bsscfgidx)
            .ok_or(WhdError::InvalidInterface)?;
        let handler = scan_events_handler(&driver, &this);
        let entry =
            driver.set_event_handler(self, &[WLC_E_ESCAN_RESULT, WLC_E_NONE], handler)?;
        if entry as usize >= crate::events::WHD_MAX_EVENT_SUBSCRIPTION {
            log::error!(target: "whd::scan", "scan_events registration failed");
            return Err(WhdError::Unfinished);
        }
        self.set_event_entry(WHD_SCAN_EVENT_ENTRY, entry);

        // 信道表折算 chanspec
        let consts = driver.wlan.consts();
        let chanspecs: Vec<u16> = optional_channel_list
            .unwrap_or(&[])
            .iter()
            .take_while(|ch| **ch != 0)
            .map(|ch| {
                *ch | wire::channel_to_band_bits(consts, *ch as u32)
                    | consts.chanspec_bw_20
                    | consts.chanspec_ctl_sb_none
            })
            .collect();

        let (nprobes, active_time, passive_time, home_time) = match optional_extended_params {
            Some(p) => (
                p.number_of_probes_per_channel,
                p.scan_active_dwell_time_per_channel_ms,
                p.scan_passive_dwell_time_per_channel_ms,
                p.scan_home_channel_dwell_time_between_channels_ms,
            ),
            None => (-1, -1, -1, -1),
        };
        let params = wire::EscanParams {
            action: wire::WL_SCAN_ACTION_START,
            scan_type: scan_type as i8,
            bss_type: bss_type as i8,
            ssid: optional_ssid,
            bssid: optional_mac,
            nprobes,
            active_time,
            passive_time,
            home_time,
            channel_list: &chanspecs,
        };
        let (mut pkt, off) =
            crate::api::iovar_buffer(&driver, cdc::IOVAR_STR_ESCAN, params.encoded_len())?;
        params.encode(&mut pkt.data_mut()[off..]);

        *driver.internal.scan_callback.lock() = Some(callback);

        if let Err(e) = driver.channel.set_iovar(&driver.wlan, self.ifidx, pkt) {
            *driver.internal.scan_callback.lock() = None;
            let entry = self.event_entry(WHD_SCAN_EVENT_ENTRY);
            if entry != WHD_EVENT_NOT_REGISTERED {
                let _ = driver.deregister_event_handler(entry);
                self.set_event_entry(WHD_SCAN_EVENT_ENTRY, WHD_EVENT_NOT_REGISTERED);
            }
            return Err(e);
        }
        Ok(())
    }

    /// 中止扫描（对应 whd_wifi_stop_scan）；回调收到 Aborted
    pub fn stop_scan(&self) -> WhdResult<()> {
        let driver = self.driver()?;
        let params = wire::EscanParams {
            action: wire::WL_SCAN_ACTION_ABORT,
            scan_type: 0,
            bss_type: BssType::Any as i8,
            ssid: None,
            bssid: None,
            nprobes: -1,
            active_time: -1,
            passive_time: -1,
            home_time: -1,
            channel_list: &[],
        };
        let (mut pkt, off) =
            crate::api::iovar_buffer(&driver, cdc::IOVAR_STR_ESCAN, params.encoded_len())?;
        params.encode(&mut pkt.data_mut()[off..]);
        driver.channel.set_iovar(&driver.wlan, self.ifidx, pkt)
    }

    /// 阻塞式扫描（对应 whd_wifi_scan_synch）：填满调用方数组，按 BSSID 去重
    pub fn scan_synchronous(&self, results: &mut [SyncScanResult]) -> WhdResult<usize> {
        let driver = self.driver()?;
        let sem = driver.rtos.semaphore(1, 0);
        let capacity = results.len();
        let collected: Arc<spin::Mutex<Vec<SyncScanResult>>> =
            Arc::new(spin::Mutex::new(Vec::new()));

        let sem_cb = sem.clone();
        let collected_cb = collected.clone();
        let callback: ScanCallback = Box::new(move |record, status| match record {
            Some(r) => {
                let mut list = collected_cb.lock();
                if list.len() < capacity && !list.iter().any(|e| e.bssid == r.bssid) {
                    list.push(SyncScanResult {
                        ssid: r.ssid,
                        bssid: r.bssid,
                        security: r.security,
                        signal_strength: r.signal_strength,
                        max_data_rate: r.max_data_rate,
                        channel: r.channel,
                        band: r.band,
                    });
                }
            }
            None => {
                let _ = status;
                sem_cb.release();
            }
        });

        self.scan(
            ScanType::Active,
            BssType::Any,
            None,
            None,
            None,
            None,
            callback,
        )?;
        sem.acquire(chip::NEVER_TIMEOUT);

        let list = collected.lock();
        let n = list.len().min(results.len());
        results[..n].copy_from_slice(&list[..n]);
        Ok(n)
    }
}
