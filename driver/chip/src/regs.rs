//! SDIO 背板寄存器与位定义（对应 whd_chip_reg.h / whd_sdio.h）

/// F1 芯片时钟控制寄存器（chipClockCSR）
pub const SDIO_CHIP_CLOCK_CSR: u32 = 0x1000E;
/// F1 上拉配置
pub const SDIO_PULL_UP: u32 = 0x1000F;
/// F1 唤醒控制（WakeupCtrl）
pub const SDIO_WAKEUP_CTRL: u32 = 0x1001E;
/// F1 睡眠控制寄存器（sleepCSR，KSO 位所在）
pub const SDIO_SLEEP_CSR: u32 = 0x1001F;

/// F0 Broadcom 卡能力寄存器
pub const SDIOD_CCCR_BRCM_CARDCAP: u32 = 0xF0;
/// 卡能力：no-cmd-decode 模式（总线活动即可唤醒芯片）
pub const SDIOD_CCCR_BRCM_CARDCAP_CMD_NODEC: u32 = 0x08;

// chipClockCSR 位
pub const SBSDIO_FORCE_ALP: u8 = 0x01;
pub const SBSDIO_FORCE_HT: u8 = 0x02;
pub const SBSDIO_FORCE_ILP: u8 = 0x04;
pub const SBSDIO_ALP_AVAIL_REQ: u8 = 0x08;
pub const SBSDIO_HT_AVAIL_REQ: u8 = 0x10;
pub const SBSDIO_FORCE_HW_CLKREQ_OFF: u8 = 0x20;
pub const SBSDIO_ALP_AVAIL: u8 = 0x40;
pub const SBSDIO_HT_AVAIL: u8 = 0x80;

// sleepCSR 位
pub const SBSDIO_SLPCSR_KEEP_WL_KSO: u8 = 0x01;
pub const SBSDIO_SLPCSR_WL_DEVON: u8 = 0x02;

// WakeupCtrl 位
pub const SBSDIO_WCTRL_WL_WAKE_TILL_ALP_AVAIL: u8 = 0x01;
pub const SBSDIO_WCTRL_WL_WAKE_TILL_HT_AVAIL: u8 = 0x02;

/// KSO 置位轮询间隔（毫秒）
pub const KSO_WAIT_MS: u32 = 1;
/// KSO 置位最大尝试次数（硅片勘误：sleepCSR 写入与 PMU 32k 时钟同步，单次可能丢失）
pub const MAX_KSO_ATTEMPTS: u32 = 64;
/// HT 时钟就绪轮询间隔（毫秒）
pub const HT_AVAIL_WAIT_MS: u32 = 1;
/// HT 时钟就绪最大轮询次数（约 1000 ms 预算）
pub const WLAN_BUS_UP_ATTEMPTS: u32 = 1000;

// chipcommon 背板地址（save/restore 能力探测用）
pub const CHIPCOMMON_BASE_ADDRESS: u32 = 0x1800_0000;
pub const CHIPCOMMON_SR_CONTROL1: u32 = CHIPCOMMON_BASE_ADDRESS + 0x508;
pub const CHIPCOMMON_CORE_CAPEXT_ADDR: u32 = CHIPCOMMON_BASE_ADDRESS + 0x64C;
pub const CHIPCOMMON_CORE_CAPEXT_SR_SUPPORTED: u32 = 1 << 1;
pub const CHIPCOMMON_CORE_RETENTION_CTL: u32 = CHIPCOMMON_BASE_ADDRESS + 0x670;
pub const RCTL_MACPHY_DISABLE: u32 = 1 << 26;
pub const RCTL_LOGIC_DISABLE: u32 = 1 << 27;

/// WLAN RAM 背板基址（wlan_shared 指针在 RAM 末字）
pub const PLATFORM_WLAN_RAM_BASE: u32 = 0;

/// PMU 最小资源掩码寄存器
pub const PMU_MINRESMASK_ADDR: u32 = 0x1800_0618;
/// 43012 DS1 退出后回写的默认 min-res-mask
pub const DEFAULT_43012_MIN_RES_MASK: u32 = 0x0F8B_FE77;

// D11 核 maccontrol（host 强制 MAC 醒来用）
pub const D11_MACCONTROL_REG: u32 = 0x1810_1120;
pub const D11_MACCONTROL_REG_SIZE: u8 = 4;
pub const D11_MACCONTROL_REG_WAKE: u32 = 1 << 26;

// DS1 控制共享内存（M_DS1_CTRL_SDIO）位
pub const C_DS1_CTRL_SDIO_DS1_EXIT: u32 = 1 << 0;
pub const C_DS1_CTRL_PROC_DONE: u32 = 1 << 1;
pub const C_DS1_CTRL_REQ_VALID: u32 = 1 << 2;
/// DS1 退出 proc-done 轮询：最多 50 次，每次 100 ms
pub const DS1_EXIT_MAX_POLLS: u32 = 50;
pub const DS1_EXIT_POLL_MS: u32 = 100;
