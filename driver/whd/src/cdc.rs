//! 控制消息编解码（C1）
//!
//! 对应 whd_cdc_bdc.c / whd_wlioctl.h：IOCTL / IOVAR 请求帧由 16 字节
//! CDC 头 + 载荷构成，线上整数一律小端。IOVAR 载荷以 NUL 结尾变量名
//! 打头；`bsscfg:` 前缀变量随后带 4 字节小端 bss 下标。

use crate::result::{WhdError, WhdResult};

/// CDC 头长度
pub const CDC_HEADER_LEN: usize = 16;

// flags 字段位分配
pub const CDCF_IOC_ERROR: u32 = 0x01;
pub const CDCF_IOC_SET: u32 = 0x02;
pub const CDCF_IOC_IF_MASK: u32 = 0xF000;
pub const CDCF_IOC_IF_SHIFT: u32 = 12;
pub const CDCF_IOC_ID_MASK: u32 = 0xFFFF_0000;
pub const CDCF_IOC_ID_SHIFT: u32 = 16;

// IOCTL 命令号（whd_wlioctl.h）
pub const WLC_UP: u32 = 2;
pub const WLC_DOWN: u32 = 3;
pub const WLC_SET_INFRA: u32 = 20;
pub const WLC_GET_AUTH: u32 = 21;
pub const WLC_SET_AUTH: u32 = 22;
pub const WLC_GET_BSSID: u32 = 23;
pub const WLC_GET_SSID: u32 = 25;
pub const WLC_SET_SSID: u32 = 26;
pub const WLC_GET_CHANNEL: u32 = 29;
pub const WLC_SET_CHANNEL: u32 = 30;
pub const WLC_DISASSOC: u32 = 52;
pub const WLC_GET_BCNPRD: u32 = 75;
pub const WLC_SET_BCNPRD: u32 = 76;
pub const WLC_GET_DTIMPRD: u32 = 77;
pub const WLC_SET_DTIMPRD: u32 = 78;
pub const WLC_SET_COUNTRY: u32 = 84;
pub const WLC_GET_PM: u32 = 85;
pub const WLC_SET_PM: u32 = 86;
pub const WLC_SET_GMODE: u32 = 110;
pub const WLC_GET_RSSI: u32 = 127;
pub const WLC_GET_WSEC: u32 = 133;
pub const WLC_SET_WSEC: u32 = 134;
pub const WLC_GET_BSS_INFO: u32 = 136;
pub const WLC_GET_ASSOCLIST: u32 = 159;
pub const WLC_GET_WPA_AUTH: u32 = 164;
pub const WLC_SET_WPA_AUTH: u32 = 165;
pub const WLC_SCB_DEAUTHENTICATE_FOR_REASON: u32 = 201;
pub const WLC_GET_VALID_CHANNELS: u32 = 217;
pub const WLC_GET_VAR: u32 = 262;
pub const WLC_SET_VAR: u32 = 263;
pub const WLC_SET_WSEC_PMK: u32 = 268;

// IOVAR 变量名（whd_wlioctl.h IOVAR_STR_*）
pub const IOVAR_STR_ESCAN: &str = "escan";
pub const IOVAR_STR_JOIN: &str = "join";
pub const IOVAR_STR_SUP_WPA: &str = "sup_wpa";
pub const IOVAR_STR_SUP_WPA2_EAPVER: &str = "sup_wpa2_eapver";
pub const IOVAR_STR_SUP_WPA_TMO: &str = "sup_wpa_tmo";
pub const IOVAR_STR_SAE_PASSWORD: &str = "sae_password";
pub const IOVAR_STR_MFP: &str = "mfp";
pub const IOVAR_STR_ROAM_OFF: &str = "roam_off";
pub const IOVAR_STR_CHANSPEC: &str = "chanspec";
pub const IOVAR_STR_CSA: &str = "csa";
pub const IOVAR_STR_WPA_AUTH: &str = "wpa_auth";
pub const IOVAR_STR_WSEC: &str = "wsec";
pub const IOVAR_STR_WSEC_INFO: &str = "wsec_info";
pub const IOVAR_STR_CAP: &str = "cap";
pub const IOVAR_STR_COUNTRY: &str = "country";
pub const IOVAR_STR_EVENT_MSGS: &str = "event_msgs";
pub const IOVAR_STR_CUR_ETHERADDR: &str = "cur_etheraddr";
pub const IOVAR_STR_PM2_SLEEP_RET: &str = "pm2_sleep_ret";
pub const IOVAR_STR_MPDU_PER_AMPDU: &str = "mpdu_per_ampdu";
pub const IOVAR_STR_WOWL: &str = "wowl";
pub const IOVAR_STR_WOWL_OS: &str = "wowl_os";
pub const IOVAR_STR_PMKID_INFO: &str = "pmkid_info";
pub const IOVAR_STR_AUTH_STATUS: &str = "auth_status";
pub const IOVAR_STR_MGMT_FRAME: &str = "mgmt_frame";
pub const IOVAR_STR_VERSION: &str = "ver";
pub const IOVAR_STR_CLMVER: &str = "clmver";
/// bss 下标前缀：随后 4 字节小端 bss index
pub const IOVAR_BSSCFG_PREFIX: &str = "bsscfg:";

/// 协商出的 IOVAR 缓冲上限（名字 + 载荷超限报 BadLength→BadArg）
pub const WHD_IOVAR_BUF_MAX: usize = 1500;

// BCME 固件状态码（响应 status 字段，负值）
pub const BCME_OK: i32 = 0;
pub const BCME_UNSUPPORTED: i32 = -23;

// 小端字节序转换（host_to_dongle / dongle_to_host）
#[inline]
pub fn htod16(v: u16) -> [u8; 2] {
    v.to_le_bytes()
}

#[inline]
pub fn htod32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

#[inline]
pub fn dtoh16(b: [u8; 2]) -> u16 {
    u16::from_le_bytes(b)
}

#[inline]
pub fn dtoh32(b: [u8; 4]) -> u32 {
    u32::from_le_bytes(b)
}

#[inline]
pub fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

#[inline]
pub fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
pub fn write_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

#[inline]
pub fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

/// CDC 头（对应 cdc_header_t）：cmd / len / flags / status，各 4 字节小端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdcHeader {
    pub cmd: u32,
    pub len: u32,
    pub flags: u32,
    pub status: u32,
}

impl CdcHeader {
    pub fn new(cmd: u32, len: u32, tx_id: u16, ifidx: u8, set: bool) -> Self {
        let mut flags = ((tx_id as u32) << CDCF_IOC_ID_SHIFT)
            | (((ifidx as u32) << CDCF_IOC_IF_SHIFT) & CDCF_IOC_IF_MASK);
        if set {
            flags |= CDCF_IOC_SET;
        }
        Self {
            cmd,
            len,
            flags,
            status: 0,
        }
    }

    #[inline]
    pub fn tx_id(&self) -> u16 {
        ((self.flags & CDCF_IOC_ID_MASK) >> CDCF_IOC_ID_SHIFT) as u16
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.flags & CDCF_IOC_ERROR != 0
    }

    pub fn encode(&self, out: &mut [u8]) {
        write_u32(out, 0, self.cmd);
        write_u32(out, 4, self.len);
        write_u32(out, 8, self.flags);
        write_u32(out, 12, self.status);
    }

    pub fn decode(buf: &[u8]) -> WhdResult<Self> {
        if buf.len() < CDC_HEADER_LEN {
            return Err(WhdError::IoctlFail);
        }
        Ok(Self {
            cmd: read_u32(buf, 0),
            len: read_u32(buf, 4),
            flags: read_u32(buf, 8),
            status: read_u32(buf, 12),
        })
    }

    /// 固件状态码折算（对应 whd_set_error 的 BCME → whd_result 映射）
    pub fn firmware_result(&self) -> WhdResult<()> {
        if !self.is_error() {
            return Ok(());
        }
        match self.status as i32 {
            BCME_OK => Ok(()),
            BCME_UNSUPPORTED => Err(WhdError::WlanUnsupported),
            _ => Err(WhdError::IoctlFail),
        }
    }
}

/// 变量是否走 `bsscfg:` 前缀编码
#[inline]
pub fn is_bsscfg_var(name: &str) -> bool {
    name.starts_with(IOVAR_BSSCFG_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdc_header_round_trip() {
        let hdr = CdcHeader::new(WLC_SET_SSID, 36, 0x1234, 2, true);
        let mut buf = [0u8; CDC_HEADER_LEN];
        hdr.encode(&mut buf);
        let back = CdcHeader::decode(&buf).unwrap();
        assert_eq!(back, hdr);
        assert_eq!(back.tx_id(), 0x1234);
        assert!(back.flags & CDCF_IOC_SET != 0);
        assert_eq!((back.flags & CDCF_IOC_IF_MASK) >> CDCF_IOC_IF_SHIFT, 2);
    }

    #[test]
    fn header_is_little_endian_on_wire() {
        let hdr = CdcHeader::new(WLC_UP, 0x0102_0304, 1, 0, false);
        let mut buf = [0u8; CDC_HEADER_LEN];
        hdr.encode(&mut buf);
        assert_eq!(&buf[0..4], &[2, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn endianness_law() {
        for v in [0u16, 1, 0xABCD, u16::MAX] {
            assert_eq!(dtoh16(htod16(v)), v);
        }
        for v in [0u32, 1, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(dtoh32(htod32(v)), v);
        }
    }

    #[test]
    fn firmware_status_mapping() {
        let mut hdr = CdcHeader::new(WLC_UP, 0, 1, 0, true);
        assert_eq!(hdr.firmware_result(), Ok(()));
        hdr.flags |= CDCF_IOC_ERROR;
        hdr.status = BCME_UNSUPPORTED as u32;
        assert_eq!(hdr.firmware_result(), Err(crate::WhdError::WlanUnsupported));
        hdr.status = (-17i32) as u32;
        assert_eq!(hdr.firmware_result(), Err(crate::WhdError::IoctlFail));
    }
}
