//! 802.11 信息元素（IE）遍历
//!
//! 对应 whd_utils.c whd_parse_tlvs / whd_parse_dot11_tlvs：对声明长度校验的
//! 惰性 (tag, length, value) 迭代；越界即停，整条扫描记录由调用方丢弃。

// IE 标签
pub const DOT11_IE_ID_SSID: u8 = 0;
pub const DOT11_IE_ID_COUNTRY: u8 = 7;
pub const DOT11_IE_ID_HT_CAPABILITIES: u8 = 45;
pub const DOT11_IE_ID_RSN: u8 = 48;
pub const DOT11_IE_ID_VENDOR_SPECIFIC: u8 = 221;
pub const DOT11_IE_ID_RSNX: u8 = 244;

#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    pub id: u8,
    pub data: &'a [u8],
}

pub struct TlvIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TlvIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Tlv<'a>> {
        if self.pos + 2 > self.buf.len() {
            return None;
        }
        let id = self.buf[self.pos];
        let len = self.buf[self.pos + 1] as usize;
        if self.pos + 2 + len > self.buf.len() {
            // 长度越过声明缓冲：整段视为损坏
            self.pos = self.buf.len();
            return None;
        }
        let data = &self.buf[self.pos + 2..self.pos + 2 + len];
        self.pos += 2 + len;
        Some(Tlv { id, data })
    }
}

/// IE 区是否完整成帧（首个越界即判废）
pub fn validate(buf: &[u8]) -> bool {
    let mut pos = 0;
    while pos + 2 <= buf.len() {
        let len = buf[pos + 1] as usize;
        if pos + 2 + len > buf.len() {
            return false;
        }
        pos += 2 + len;
    }
    pos == buf.len()
}

/// 找第一个指定标签的 IE
pub fn find_tlv(buf: &[u8], id: u8) -> Option<&[u8]> {
    TlvIter::new(buf).find(|t| t.id == id).map(|t| t.data)
}

const WPA_OUI_TYPE: [u8; 4] = [0x00, 0x50, 0xF2, 0x01];

/// 找 WPA vendor IE（OUI 00:50:F2 类型 1），返回 OUI 头之后的部分
pub fn find_wpa_ie(buf: &[u8]) -> Option<&[u8]> {
    TlvIter::new(buf)
        .find(|t| {
            t.id == DOT11_IE_ID_VENDOR_SPECIFIC
                && t.data.len() >= 4
                && t.data[..4] == WPA_OUI_TYPE
        })
        .map(|t| &t.data[4..])
}
