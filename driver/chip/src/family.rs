//! 芯片家族常量表
//!
//! 对应 whd_chip_constants.c 的 GET_C_VAR：chanspec 位编码、唤醒方式、
//! PMU min-res-mask 按芯片 id 在 init 时选定一次。

/// 唤醒方式：KSO 能力芯片 vs 传统时钟门控芯片 vs 总线自管理芯片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStyle {
    /// sleepCSR KEEP_KSO 握手（save/restore 固件）
    Kso,
    /// chipClockCSR HT_AVAIL_REQ / HT_AVAIL 轮询
    ClockGate,
    /// M2M / msgbuf 总线自行管理，唤醒为空操作
    BusManaged,
}

/// 每家族常量（对应 whd_chip_constants.h 的 chip_var_t 子集）
#[derive(Debug, Clone, Copy)]
pub struct ChipConst {
    pub chanspec_band_2g: u16,
    pub chanspec_band_5g: u16,
    pub chanspec_band_6g: u16,
    pub chanspec_band_mask: u16,
    pub chanspec_bw_20: u16,
    pub chanspec_ctl_sb_none: u16,
    pub chanspec_chan_mask: u16,
    pub wake_style: WakeStyle,
    /// KSO 写入需要双写（SR 模块唤醒勘误）且 off 路径也轮询回读
    pub kso_double_write_poll_off: bool,
    /// save/restore 恒启用（DM/安全芯片，host 读不到 PMU SR 状态）
    pub sr_always_on: bool,
    /// WakeupCtrl 置 ALP-avail 请求位（否则置 HT-avail 请求位）
    pub wake_till_alp_avail: bool,
    /// 具备 DS1 深睡（退出需共享内存握手）
    pub ds1_capable: bool,
    pub pmu_min_res_mask: u32,
    /// WLAN RAM 大小（固件把 wlan_shared 指针写在末字）
    pub chip_ram_size: u32,
    /// ATCM RAM 基址偏移（无 ATCM 的芯片为 0）
    pub atcm_ram_base: u32,
}

/// d11ac 代 chanspec 编码
const MODERN: ChipConst = ChipConst {
    chanspec_band_2g: 0x0000,
    chanspec_band_5g: 0xC000,
    chanspec_band_6g: 0x8000,
    chanspec_band_mask: 0xC000,
    chanspec_bw_20: 0x1000,
    chanspec_ctl_sb_none: 0x0000,
    chanspec_chan_mask: 0x00FF,
    wake_style: WakeStyle::Kso,
    kso_double_write_poll_off: false,
    sr_always_on: false,
    wake_till_alp_avail: true,
    ds1_capable: false,
    pmu_min_res_mask: 0,
    chip_ram_size: 0x8_0000,
    atcm_ram_base: 0,
};

/// d11n 代 chanspec 编码（band|bw|sb 已合并编码）
const LEGACY: ChipConst = ChipConst {
    chanspec_band_2g: 0x2B00,
    chanspec_band_5g: 0x1B00,
    chanspec_band_6g: 0x0000,
    chanspec_band_mask: 0x3F00,
    chanspec_bw_20: 0x0000,
    chanspec_ctl_sb_none: 0x0000,
    chanspec_chan_mask: 0x00FF,
    wake_style: WakeStyle::ClockGate,
    kso_double_write_poll_off: false,
    sr_always_on: false,
    wake_till_alp_avail: false,
    ds1_capable: false,
    pmu_min_res_mask: 0,
    chip_ram_size: 0x3_C000,
    atcm_ram_base: 0,
};

/// 按芯片 id 选常量集（对应 whd_chip_constants.c 的初始化表）
pub fn chip_const(chip_id: u16) -> &'static ChipConst {
    match chip_id {
        43012 => {
            const C: ChipConst = ChipConst {
                ds1_capable: true,
                pmu_min_res_mask: super::regs::DEFAULT_43012_MIN_RES_MASK,
                chip_ram_size: 0xE_0000,
                ..MODERN
            };
            &C
        }
        0x4373 => {
            const C: ChipConst = ChipConst {
                chip_ram_size: 0xE_0000,
                atcm_ram_base: 0x16_0000,
                ..MODERN
            };
            &C
        }
        43022 | 55500 | 55530 | 55560 => {
            const C: ChipConst = ChipConst {
                sr_always_on: true,
                ..MODERN
            };
            &C
        }
        // M2M / msgbuf 芯片：总线自行管理电源
        43909 | 55900 | 89530 => {
            const C: ChipConst = ChipConst {
                wake_style: WakeStyle::BusManaged,
                ..MODERN
            };
            &C
        }
        43430 | 43439 => {
            const C: ChipConst = ChipConst {
                kso_double_write_poll_off: true,
                wake_till_alp_avail: false,
                ..MODERN
            };
            &C
        }
        4334 | 43362 => {
            const C: ChipConst = LEGACY;
            &C
        }
        _ => {
            const C: ChipConst = MODERN;
            &C
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_selection() {
        assert_eq!(chip_const(43362).wake_style, WakeStyle::ClockGate);
        assert_eq!(chip_const(43909).wake_style, WakeStyle::BusManaged);
        assert!(chip_const(43012).ds1_capable);
        assert!(chip_const(43022).sr_always_on);
        assert!(chip_const(43439).kso_double_write_poll_off);
        assert_eq!(chip_const(0x4373).wake_style, WakeStyle::Kso);
    }
}
