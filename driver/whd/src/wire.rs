//! 固件线上结构（对应 whd_wlioctl.h 中随 IOCTL/IOVAR 传输的结构体）
//!
//! 所有整数小端。布局按字段偏移显式编码，不依赖 repr 对齐。

use alloc::vec::Vec;
use chip::ChipConst;

use crate::cdc::{read_u16, read_u32, write_u16, write_u32};
use crate::result::{WhdError, WhdResult};
use crate::types::{Band, Mac, Ssid};

/// wlc_ssid_t：SSID_len u32 + SSID[32]
pub const WLC_SSID_SIZE: usize = 36;

pub fn encode_wlc_ssid(ssid: &Ssid, out: &mut [u8]) {
    write_u32(out, 0, ssid.len as u32);
    out[4..4 + 32].copy_from_slice(&ssid.value);
}

// ============================ chanspec ============================

/// 由家族常量组装 20 MHz chanspec（band | bw20 | sb_none | channel）
pub fn chanspec_for(consts: &ChipConst, band: Band, channel: u8) -> u16 {
    let band_bits = match band {
        Band::Band2_4Ghz => consts.chanspec_band_2g,
        Band::Band5Ghz => consts.chanspec_band_5g,
        Band::Band6Ghz => consts.chanspec_band_6g,
    };
    channel as u16 | band_bits | consts.chanspec_bw_20 | consts.chanspec_ctl_sb_none
}

/// 2.4G 信道上限（whd_channel_to_wl_band 的分界）
pub const CH_MAX_2G_CHANNEL: u32 = 14;

pub fn channel_to_band_bits(consts: &ChipConst, channel: u32) -> u16 {
    if channel <= CH_MAX_2G_CHANNEL {
        consts.chanspec_band_2g
    } else {
        consts.chanspec_band_5g
    }
}

pub fn chanspec_band(consts: &ChipConst, chanspec: u16) -> Band {
    let bits = chanspec & consts.chanspec_band_mask;
    if bits == consts.chanspec_band_2g {
        Band::Band2_4Ghz
    } else if bits == consts.chanspec_band_6g && consts.chanspec_band_6g != 0 {
        Band::Band6Ghz
    } else {
        Band::Band5Ghz
    }
}

#[inline]
pub fn chanspec_channel(consts: &ChipConst, chanspec: u16) -> u8 {
    (chanspec & consts.chanspec_chan_mask) as u8
}

// ============================ escan ============================

pub const ESCAN_REQ_VERSION: u32 = 1;
pub const WL_SCAN_ACTION_START: u16 = 1;
pub const WL_SCAN_ACTION_CONTINUE: u16 = 2;
pub const WL_SCAN_ACTION_ABORT: u16 = 3;

/// wl_scan_params_t 固定部分：ssid(36) + bssid(6) + bss_type/scan_type +
/// nprobes/active/passive/home(各 4) + channel_num(4)
pub const WL_SCAN_PARAMS_FIXED_SIZE: usize = 64;
/// wl_escan_params_t 头：version u32 + action u16 + sync_id u16
pub const WL_ESCAN_HEADER_SIZE: usize = 8;

/// escan 请求参数（wl_escan_params_t）
pub struct EscanParams<'a> {
    pub action: u16,
    pub scan_type: i8,
    pub bss_type: i8,
    pub ssid: Option<&'a Ssid>,
    pub bssid: Option<&'a Mac>,
    pub nprobes: i32,
    pub active_time: i32,
    pub passive_time: i32,
    pub home_time: i32,
    pub channel_list: &'a [u16],
}

impl<'a> EscanParams<'a> {
    pub fn encoded_len(&self) -> usize {
        WL_ESCAN_HEADER_SIZE + WL_SCAN_PARAMS_FIXED_SIZE + self.channel_list.len() * 2
    }

    pub fn encode(&self, out: &mut [u8]) {
        out[..self.encoded_len()].fill(0);
        write_u32(out, 0, ESCAN_REQ_VERSION);
        write_u16(out, 4, self.action);
        // sync_id 固定 0：单扫描实例
        let p = WL_ESCAN_HEADER_SIZE;
        if let Some(ssid) = self.ssid {
            encode_wlc_ssid(ssid, &mut out[p..]);
        }
        match self.bssid {
            Some(mac) => out[p + 36..p + 42].copy_from_slice(&mac.0),
            None => out[p + 36..p + 42].fill(0xFF),
        }
        out[p + 42] = self.bss_type as u8;
        out[p + 43] = self.scan_type as u8;
        write_u32(out, p + 44, self.nprobes as u32);
        write_u32(out, p + 48, self.active_time as u32);
        write_u32(out, p + 52, self.passive_time as u32);
        write_u32(out, p + 56, self.home_time as u32);
        write_u32(out, p + 60, self.channel_list.len() as u32);
        let mut off = p + WL_SCAN_PARAMS_FIXED_SIZE;
        for ch in self.channel_list {
            write_u16(out, off, *ch);
            off += 2;
        }
    }
}

/// wl_escan_result_t 头：buflen u32 + version u32 + sync_id u16 + bss_count u16
pub const WL_ESCAN_RESULT_FIXED_SIZE: usize = 12;

pub struct EscanResult<'a> {
    pub bss_count: u16,
    pub bss_info: &'a [u8],
}

pub fn decode_escan_result(buf: &[u8]) -> WhdResult<EscanResult<'_>> {
    if buf.len() < WL_ESCAN_RESULT_FIXED_SIZE {
        return Err(WhdError::PartialResults);
    }
    Ok(EscanResult {
        bss_count: read_u16(buf, 10),
        bss_info: &buf[WL_ESCAN_RESULT_FIXED_SIZE..],
    })
}

// ============================ wl_bss_info ============================

pub const WL_BSS_INFO_VERSION: u32 = 109;
/// wl_bss_info_t 固定部分长度（IE 紧随其后，ie_offset 自结构起算）
pub const WL_BSS_INFO_FIXED_SIZE: usize = 128;

// 字段偏移
const BI_VERSION: usize = 0;
const BI_LENGTH: usize = 4;
const BI_BSSID: usize = 8;
const BI_BEACON_PERIOD: usize = 14;
const BI_CAPABILITY: usize = 16;
const BI_SSID_LEN: usize = 18;
const BI_SSID: usize = 19;
const BI_RATESET_COUNT: usize = 52;
const BI_RATESET_RATES: usize = 56;
const BI_CHANSPEC: usize = 72;
const BI_DTIM_PERIOD: usize = 76;
const BI_RSSI: usize = 78;
const BI_PHY_NOISE: usize = 80;
const BI_N_CAP: usize = 81;
const BI_CTL_CH: usize = 88;
const BI_FLAGS: usize = 96;
const BI_IE_OFFSET: usize = 116;
const BI_IE_LENGTH: usize = 120;

pub const DOT11_CAP_ESS: u16 = 0x0001;
pub const DOT11_CAP_IBSS: u16 = 0x0002;
pub const DOT11_CAP_PRIVACY: u16 = 0x0010;

pub const WL_BSS_FLAGS_FROM_BEACON: u8 = 0x01;
pub const WL_BSS_FLAGS_RSSI_ONCHANNEL: u8 = 0x04;

const RSPEC_KBPS_MASK: u8 = 0x7F;

/// rateset 单元 → kbps（RSPEC_TO_KBPS）
#[inline]
pub fn rspec_to_kbps(rate: u8) -> u32 {
    (rate & RSPEC_KBPS_MASK) as u32 * 500
}

/// 解码后的 wl_bss_info_t 视图
pub struct WlBssInfo<'a> {
    pub bssid: Mac,
    pub capability: u16,
    pub ssid: Ssid,
    pub rates: &'a [u8],
    pub chanspec: u16,
    pub dtim_period: u8,
    pub rssi: i16,
    pub phy_noise: i8,
    pub n_cap: bool,
    pub ctl_ch: u8,
    pub flags: u8,
    pub ies: &'a [u8],
}

pub fn decode_bss_info(buf: &[u8]) -> WhdResult<WlBssInfo<'_>> {
    if buf.len() < WL_BSS_INFO_FIXED_SIZE {
        return Err(WhdError::PartialResults);
    }
    let version = read_u32(buf, BI_VERSION);
    if version != WL_BSS_INFO_VERSION {
        // PNO 结果携带旧版本号，整条丢弃
        return Err(WhdError::PartialResults);
    }
    let length = read_u32(buf, BI_LENGTH) as usize;
    let ssid_len = buf[BI_SSID_LEN] as usize;
    let ie_offset = read_u16(buf, BI_IE_OFFSET) as usize;
    let ie_length = read_u32(buf, BI_IE_LENGTH) as usize;
    if ssid_len > 32
        || ie_offset < WL_BSS_INFO_FIXED_SIZE
        || length > buf.len()
        || ie_offset > length
        || ie_length > length - ie_offset
    {
        return Err(WhdError::PartialResults);
    }
    let mut bssid = [0u8; 6];
    bssid.copy_from_slice(&buf[BI_BSSID..BI_BSSID + 6]);
    let mut ssid_value = [0u8; 32];
    ssid_value[..ssid_len].copy_from_slice(&buf[BI_SSID..BI_SSID + ssid_len]);
    let rate_count = (read_u32(buf, BI_RATESET_COUNT) as usize).min(16);
    Ok(WlBssInfo {
        bssid: Mac(bssid),
        capability: read_u16(buf, BI_CAPABILITY),
        ssid: Ssid {
            len: ssid_len as u8,
            value: ssid_value,
        },
        rates: &buf[BI_RATESET_RATES..BI_RATESET_RATES + rate_count],
        chanspec: read_u16(buf, BI_CHANSPEC),
        dtim_period: buf[BI_DTIM_PERIOD],
        rssi: read_u16(buf, BI_RSSI) as i16,
        phy_noise: buf[BI_PHY_NOISE] as i8,
        n_cap: buf[BI_N_CAP] != 0,
        ctl_ch: buf[BI_CTL_CH],
        flags: buf[BI_FLAGS],
        ies: &buf[ie_offset..ie_offset + ie_length],
    })
}

/// 构造一条 wl_bss_info_t（固件侧编码；escan 事件仿真与回环测试用）
pub struct BssInfoBuilder<'a> {
    pub bssid: Mac,
    pub capability: u16,
    pub ssid: &'a [u8],
    pub rates: &'a [u8],
    pub chanspec: u16,
    pub rssi: i16,
    pub n_cap: bool,
    pub ctl_ch: u8,
    pub flags: u8,
    pub ies: &'a [u8],
}

impl<'a> BssInfoBuilder<'a> {
    pub fn encode(&self) -> Vec<u8> {
        let total = WL_BSS_INFO_FIXED_SIZE + self.ies.len();
        let mut buf = alloc::vec![0u8; total];
        write_u32(&mut buf, BI_VERSION, WL_BSS_INFO_VERSION);
        write_u32(&mut buf, BI_LENGTH, total as u32);
        buf[BI_BSSID..BI_BSSID + 6].copy_from_slice(&self.bssid.0);
        write_u16(&mut buf, BI_BEACON_PERIOD, 100);
        write_u16(&mut buf, BI_CAPABILITY, self.capability);
        buf[BI_SSID_LEN] = self.ssid.len() as u8;
        buf[BI_SSID..BI_SSID + self.ssid.len()].copy_from_slice(self.ssid);
        write_u32(&mut buf, BI_RATESET_COUNT, self.rates.len() as u32);
        buf[BI_RATESET_RATES..BI_RATESET_RATES + self.rates.len()].copy_from_slice(self.rates);
        write_u16(&mut buf, BI_CHANSPEC, self.chanspec);
        write_u16(&mut buf, BI_RSSI, self.rssi as u16);
        buf[BI_N_CAP] = self.n_cap as u8;
        buf[BI_CTL_CH] = self.ctl_ch;
        buf[BI_FLAGS] = self.flags;
        write_u16(&mut buf, BI_IE_OFFSET, WL_BSS_INFO_FIXED_SIZE as u16);
        write_u32(&mut buf, BI_IE_LENGTH, self.ies.len() as u32);
        buf[WL_BSS_INFO_FIXED_SIZE..].copy_from_slice(self.ies);
        buf
    }
}

// ============================ join 参数 ============================

/// wl_join_scan_params_t：scan_type u8 + pad[3] + nprobes/active/passive/home
const JOIN_SCAN_PARAMS_SIZE: usize = 20;
/// wl_join_assoc_params_t：bssid(6) + bssid_cnt u16 + chanspec_num u32 +
/// chanspec_list[1] u16 + pad[2]
const JOIN_ASSOC_PARAMS_SIZE: usize = 16;
/// wl_extjoin_params_t 总长
pub const WL_EXTJOIN_PARAMS_SIZE: usize =
    WLC_SSID_SIZE + JOIN_SCAN_PARAMS_SIZE + JOIN_ASSOC_PARAMS_SIZE;
/// wl_join_params_t（WLC_SET_SSID 回退路径）总长
pub const WL_JOIN_PARAMS_SIZE: usize = WLC_SSID_SIZE + JOIN_ASSOC_PARAMS_SIZE;

fn encode_assoc_params(out: &mut [u8], bssid: &Mac, chanspec: Option<u16>) {
    out[..6].copy_from_slice(&bssid.0);
    write_u16(out, 6, 0); // bssid_cnt
    match chanspec {
        Some(cs) => {
            write_u32(out, 8, 1);
            write_u16(out, 12, cs);
        }
        None => write_u32(out, 8, 0),
    }
}

/// 组装 `join` IOVAR 载荷（wl_extjoin_params_t）。
/// assoc-scan 参数全 -1：沿用固件默认 dwell。
pub fn encode_extjoin_params(ssid: &Ssid, bssid: &Mac, chanspec: Option<u16>, out: &mut [u8]) {
    out[..WL_EXTJOIN_PARAMS_SIZE].fill(0);
    encode_wlc_ssid(ssid, out);
    let sp = WLC_SSID_SIZE;
    out[sp] = 0; // scan_type: 默认
    write_u32(out, sp + 4, -1i32 as u32); // nprobes
    write_u32(out, sp + 8, -1i32 as u32); // active_time
    write_u32(out, sp + 12, -1i32 as u32); // passive_time
    write_u32(out, sp + 16, -1i32 as u32); // home_time
    encode_assoc_params(&mut out[sp + JOIN_SCAN_PARAMS_SIZE..], bssid, chanspec);
}

/// 组装 WLC_SET_SSID 回退载荷（wl_join_params_t）
pub fn encode_join_params(ssid: &Ssid, bssid: &Mac, chanspec: Option<u16>, out: &mut [u8]) {
    out[..WL_JOIN_PARAMS_SIZE].fill(0);
    encode_wlc_ssid(ssid, out);
    encode_assoc_params(&mut out[WLC_SSID_SIZE..], bssid, chanspec);
}

// ============================ 密钥材料 ============================

/// wsec_pmk_t：key_len u16 + flags u16 + key[64]
pub const WSEC_PMK_SIZE: usize = 68;
pub const WSEC_PASSPHRASE: u16 = 1;

pub fn encode_wsec_pmk(key: &[u8], flags: u16, out: &mut [u8]) {
    out[..WSEC_PMK_SIZE].fill(0);
    write_u16(out, 0, key.len() as u16);
    write_u16(out, 2, flags);
    out[4..4 + key.len()].copy_from_slice(key);
}

/// wsec_sae_password_t：password_len u16 + password[128]
pub const WSEC_SAE_PASSWORD_SIZE: usize = 130;

pub fn encode_sae_password(key: &[u8], out: &mut [u8]) {
    out[..WSEC_SAE_PASSWORD_SIZE].fill(0);
    write_u16(out, 0, key.len() as u16);
    out[2..2 + key.len()].copy_from_slice(key);
}

// ============================ 其余控制结构 ============================

/// wl_chan_switch_t：mode u8 + count u8 + chspec u16 + reg u8 + frame_type u8
pub const WL_CHAN_SWITCH_SIZE: usize = 6;

pub struct ChanSwitch {
    pub mode: u8,
    pub count: u8,
    pub chspec: u16,
    pub reg: u8,
    pub frame_type: u8,
}

impl ChanSwitch {
    pub fn encode(&self, out: &mut [u8]) {
        out[0] = self.mode;
        out[1] = self.count;
        write_u16(out, 2, self.chspec);
        out[4] = self.reg;
        out[5] = self.frame_type;
    }

    pub fn decode(buf: &[u8]) -> WhdResult<Self> {
        if buf.len() < WL_CHAN_SWITCH_SIZE {
            return Err(WhdError::PartialResults);
        }
        Ok(Self {
            mode: buf[0],
            count: buf[1],
            chspec: read_u16(buf, 2),
            reg: buf[4],
            frame_type: buf[5],
        })
    }
}

/// client_rssi_t：rssi i32 + mac 6
pub const CLIENT_RSSI_SIZE: usize = 10;

pub fn encode_client_rssi(mac: &Mac, out: &mut [u8]) {
    write_u32(out, 0, 0);
    out[4..10].copy_from_slice(&mac.0);
}

/// wl_country_t：country_abbrev[4] + rev i32 + ccode[4]
pub const WL_COUNTRY_SIZE: usize = 12;

pub fn encode_country(ccode: [u8; 2], rev: i32, out: &mut [u8]) {
    out[..WL_COUNTRY_SIZE].fill(0);
    out[0] = ccode[0];
    out[1] = ccode[1];
    // regrev 0 时置 -1：固件自选 NVRAM/OTP 聚合
    let rev = if rev == 0 { -1 } else { rev };
    write_u32(out, 4, rev as u32);
    out[8] = ccode[0];
    out[9] = ccode[1];
}

/// channel_info_t：hw_channel i32 + target_channel i32 + scan_channel i32
pub const CHANNEL_INFO_SIZE: usize = 12;

pub fn decode_channel_info_hw_channel(buf: &[u8]) -> WhdResult<u32> {
    if buf.len() < CHANNEL_INFO_SIZE {
        return Err(WhdError::PartialResults);
    }
    Ok(read_u32(buf, 0))
}

/// maclist：count u32 + mac * count
pub fn decode_maclist(buf: &[u8], out: &mut [Mac]) -> WhdResult<u32> {
    if buf.len() < 4 {
        return Err(WhdError::PartialResults);
    }
    let count = read_u32(buf, 0);
    let usable = (count as usize)
        .min(out.len())
        .min((buf.len() - 4) / 6);
    for (i, slot) in out.iter_mut().take(usable).enumerate() {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&buf[4 + i * 6..4 + i * 6 + 6]);
        *slot = Mac(mac);
    }
    Ok(count)
}

/// pmkid：BSSID 6 + PMKID 16
pub const PMKID_SIZE: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pmkid {
    pub bssid: Mac,
    pub pmkid: [u8; 16],
}

impl Pmkid {
    pub fn encode(&self, out: &mut [u8]) {
        out[..6].copy_from_slice(&self.bssid.0);
        out[6..22].copy_from_slice(&self.pmkid);
    }

    pub fn decode(buf: &[u8]) -> WhdResult<Self> {
        if buf.len() < PMKID_SIZE {
            return Err(WhdError::PartialResults);
        }
        let mut bssid = [0u8; 6];
        bssid.copy_from_slice(&buf[..6]);
        let mut pmkid = [0u8; 16];
        pmkid.copy_from_slice(&buf[6..22]);
        Ok(Self {
            bssid: Mac(bssid),
            pmkid,
        })
    }
}

/// pmkid_list：npmkid u32 + pmkid * n
pub fn encode_pmkid_list(list: &[Pmkid], out: &mut [u8]) {
    write_u32(out, 0, list.len() as u32);
    for (i, p) in list.iter().enumerate() {
        p.encode(&mut out[4 + i * PMKID_SIZE..]);
    }
}

pub fn decode_pmkid_list(buf: &[u8]) -> WhdResult<Vec<Pmkid>> {
    if buf.len() < 4 {
        return Err(WhdError::PartialResults);
    }
    let n = read_u32(buf, 0) as usize;
    let mut list = Vec::new();
    for i in 0..n {
        let off = 4 + i * PMKID_SIZE;
        if off + PMKID_SIZE > buf.len() {
            return Err(WhdError::PartialResults);
        }
        list.push(Pmkid::decode(&buf[off..])?);
    }
    Ok(list)
}

/// wl_wsec_info xtlv（wsec_info IOVAR）：version u8 + num_tlvs u8 +
/// {id u16, len u16, data}
pub const WL_WSEC_INFO_VERSION: u8 = 1;
pub const WL_WSEC_INFO_BSS_ALGOS: u16 = 0x0306;

pub fn encode_wsec_info_algos(algos: u32, mask: u32, out: &mut [u8]) -> usize {
    out[0] = WL_WSEC_INFO_VERSION;
    out[1] = 1; // num_tlvs
    write_u16(out, 2, WL_WSEC_INFO_BSS_ALGOS);
    write_u16(out, 4, 8);
    write_u32(out, 6, algos);
    write_u32(out, 10, mask);
    14
}

// ============================ 外部认证（SAE） ============================

pub const DOT11_MGMT_HDR_LEN: usize = 24;
pub const MGMT_AUTH_FRAME_DWELL_TIME: u32 = 100;

pub const WL_EXTAUTH_START: u16 = 1;
pub const WL_EXTAUTH_ABORT: u16 = 2;
pub const WL_EXTAUTH_FAIL: u16 = 3;
pub const WL_EXTAUTH_SUCCESS: u16 = 4;

/// whd_auth_req_status_t：flags u16 + peer_mac 6 + ssid_len u32 + ssid[32] +
/// pmkid[16]
pub const AUTH_REQ_STATUS_SIZE: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthReqStatus {
    pub flags: u16,
    pub peer_mac: Mac,
    pub ssid: Ssid,
    pub pmkid: [u8; 16],
}

impl AuthReqStatus {
    pub fn encode(&self, out: &mut [u8]) {
        out[..AUTH_REQ_STATUS_SIZE].fill(0);
        write_u16(out, 0, self.flags);
        out[2..8].copy_from_slice(&self.peer_mac.0);
        write_u32(out, 8, self.ssid.len as u32);
        out[12..44].copy_from_slice(&self.ssid.value);
        out[44..60].copy_from_slice(&self.pmkid);
    }

    pub fn decode(buf: &[u8]) -> WhdResult<Self> {
        if buf.len() < AUTH_REQ_STATUS_SIZE {
            return Err(WhdError::PartialResults);
        }
        let mut peer = [0u8; 6];
        peer.copy_from_slice(&buf[2..8]);
        let len = read_u32(buf, 8).min(32) as u8;
        let mut value = [0u8; 32];
        value.copy_from_slice(&buf[12..44]);
        let mut pmkid = [0u8; 16];
        pmkid.copy_from_slice(&buf[44..60]);
        Ok(Self {
            flags: read_u16(buf, 0),
            peer_mac: Mac(peer),
            ssid: Ssid { len, value },
            pmkid,
        })
    }
}

/// whd_auth_params_t 头：dwell_time u32 + len u16（data 紧随）
pub const AUTH_PARAMS_HEADER_SIZE: usize = 6;

pub fn encode_auth_frame(dwell_time: u32, frame_body: &[u8], out: &mut [u8]) {
    write_u32(out, 0, dwell_time);
    write_u16(out, 4, frame_body.len() as u16);
    out[AUTH_PARAMS_HEADER_SIZE..AUTH_PARAMS_HEADER_SIZE + frame_body.len()]
        .copy_from_slice(frame_body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chip::chip_const;

    #[test]
    fn bss_info_round_trip() {
        let ies = [0u8, 3, b'N', b'e', b't', 1, 1, 0x82];
        let built = BssInfoBuilder {
            bssid: Mac([2, 0, 0, 0, 0, 1]),
            capability: DOT11_CAP_ESS | DOT11_CAP_PRIVACY,
            ssid: b"Net",
            rates: &[0x82, 0x84, 0x8B, 0x96],
            chanspec: 0x1006,
            rssi: -40,
            n_cap: true,
            ctl_ch: 6,
            flags: WL_BSS_FLAGS_RSSI_ONCHANNEL,
            ies: &ies,
        }
        .encode();
        let info = decode_bss_info(&built).unwrap();
        assert_eq!(info.bssid, Mac([2, 0, 0, 0, 0, 1]));
        assert_eq!(info.ssid.as_bytes(), b"Net");
        assert_eq!(info.rssi, -40);
        assert_eq!(info.chanspec, 0x1006);
        assert_eq!(info.ctl_ch, 6);
        assert_eq!(info.ies, &ies);
        assert_eq!(info.rates, &[0x82, 0x84, 0x8B, 0x96]);
    }

    #[test]
    fn bss_info_rejects_bad_version() {
        let mut built = BssInfoBuilder {
            bssid: Mac::default(),
            capability: 0,
            ssid: b"x",
            rates: &[],
            chanspec: 0,
            rssi: 0,
            n_cap: false,
            ctl_ch: 0,
            flags: 0,
            ies: &[],
        }
        .encode();
        write_u32(&mut built, 0, 107);
        assert!(decode_bss_info(&built).is_err());
    }

    #[test]
    fn escan_params_layout() {
        let ssid = Ssid::new(b"Net").unwrap();
        let channels = [0x1001u16, 0x1006];
        let params = EscanParams {
            action: WL_SCAN_ACTION_START,
            scan_type: 0,
            bss_type: 2,
            ssid: Some(&ssid),
            bssid: None,
            nprobes: -1,
            active_time: -1,
            passive_time: -1,
            home_time: -1,
            channel_list: &channels,
        };
        let mut buf = alloc::vec![0u8; params.encoded_len()];
        params.encode(&mut buf);
        assert_eq!(read_u32(&buf, 0), ESCAN_REQ_VERSION);
        assert_eq!(read_u16(&buf, 4), WL_SCAN_ACTION_START);
        assert_eq!(read_u32(&buf, 8), 3); // ssid len
        assert_eq!(&buf[8 + 36..8 + 42], &[0xFF; 6]); // 广播 bssid
        assert_eq!(read_u32(&buf, 8 + 60), 2); // channel_num
        assert_eq!(read_u16(&buf, 8 + 64), 0x1001);
    }

    #[test]
    fn extjoin_carries_bssid_and_chanspec() {
        let ssid = Ssid::new(b"Net").unwrap();
        let bssid = Mac([0xAA; 6]);
        let mut buf = [0u8; WL_EXTJOIN_PARAMS_SIZE];
        encode_extjoin_params(&ssid, &bssid, Some(0xD006), &mut buf);
        let ap = WLC_SSID_SIZE + 20;
        assert_eq!(&buf[ap..ap + 6], &[0xAA; 6]);
        assert_eq!(read_u32(&buf, ap + 8), 1);
        assert_eq!(read_u16(&buf, ap + 12), 0xD006);
        // 零信道：chanspec_num = 0，固件全信道 assoc-scan
        encode_extjoin_params(&ssid, &bssid, None, &mut buf);
        assert_eq!(read_u32(&buf, ap + 8), 0);
    }

    #[test]
    fn pmkid_list_round_trip() {
        let list = [
            Pmkid {
                bssid: Mac([1; 6]),
                pmkid: [7; 16],
            },
            Pmkid {
                bssid: Mac([2; 6]),
                pmkid: [9; 16],
            },
        ];
        let mut buf = alloc::vec![0u8; 4 + 2 * PMKID_SIZE];
        encode_pmkid_list(&list, &mut buf);
        let back = decode_pmkid_list(&buf).unwrap();
        assert_eq!(&back[..], &list[..]);
    }

    #[test]
    fn chanspec_assembly() {
        let modern = chip_const(43012);
        let cs = chanspec_for(modern, Band::Band5Ghz, 36);
        assert_eq!(chanspec_channel(modern, cs), 36);
        assert_eq!(chanspec_band(modern, cs), Band::Band5Ghz);
        let legacy = chip_const(43362);
        let cs = chanspec_for(legacy, Band::Band2_4Ghz, 6);
        assert_eq!(chanspec_channel(legacy, cs), 6);
        assert_eq!(chanspec_band(legacy, cs), Band::Band2_4Ghz);
    }

    #[test]
    fn auth_req_status_round_trip() {
        let status = AuthReqStatus {
            flags: WL_EXTAUTH_SUCCESS,
            peer_mac: Mac([5; 6]),
            ssid: Ssid::new(b"SaeNet").unwrap(),
            pmkid: [3; 16],
        };
        let mut buf = [0u8; AUTH_REQ_STATUS_SIZE];
        status.encode(&mut buf);
        assert_eq!(AuthReqStatus::decode(&buf).unwrap(), status);
    }
}
