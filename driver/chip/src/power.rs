//! 总线电源互锁与芯片唤醒/睡眠
//!
//! 对应 whd_chip.c 的 whd_ensure_wlan_bus_is_up / whd_allow_wlan_bus_to_sleep /
//! whd_kso_enable / whd_enable_save_restore，以及 WHD_WLAN_KEEP_AWAKE /
//! WHD_WLAN_LET_SLEEP 的 wake 引用计数。
//!
//! 互锁规则：命令通道在发送前 keep_awake、响应（或超时）后 let_sleep；
//! join 全程另持一个计数，避免 scan→associate→key exchange 之间芯片入睡。

use alloc::sync::Arc;
use axerrno::{AxError, AxResult};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::bus::{BusFunction, BusOps};
use crate::family::{chip_const, ChipConst, WakeStyle};
use crate::regs::*;
use crate::rtos::Rtos;

/// 芯片控制句柄：总线 + RTOS + 家族常量 + 电源互锁状态
pub struct WlanChip {
    pub bus: Arc<dyn BusOps>,
    pub rtos: Arc<dyn Rtos>,
    chip_id: u16,
    consts: &'static ChipConst,
    save_restore: AtomicBool,
    fwcap: AtomicU32,
    /// wake 请求引用计数（必须 >= 0；为 0 时才允许 KSO-off / 低功耗）
    wake_count: spin::Mutex<u32>,
    pub(crate) console: spin::Mutex<crate::console::ConsoleCursor>,
}

impl WlanChip {
    pub fn new(bus: Arc<dyn BusOps>, rtos: Arc<dyn Rtos>, chip_id: u16) -> Self {
        Self {
            bus,
            rtos,
            chip_id,
            consts: chip_const(chip_id),
            save_restore: AtomicBool::new(false),
            fwcap: AtomicU32::new(0),
            wake_count: spin::Mutex::new(0),
            console: spin::Mutex::new(crate::console::ConsoleCursor::new()),
        }
    }

    #[inline]
    pub fn chip_id(&self) -> u16 {
        self.chip_id
    }

    #[inline]
    pub fn consts(&self) -> &'static ChipConst {
        self.consts
    }

    #[inline]
    pub fn save_restore_enabled(&self) -> bool {
        self.save_restore.load(Ordering::Acquire)
    }

    /// 固件能力集合（`cap` IOVAR 解析后由上层写入）
    #[inline]
    pub fn fwcap_set(&self, flags: u32) {
        self.fwcap.store(flags, Ordering::Release);
    }

    #[inline]
    pub fn fwcap(&self) -> u32 {
        self.fwcap.load(Ordering::Acquire)
    }

    #[inline]
    pub fn fwcap_has(&self, cap: crate::FwCap) -> bool {
        self.fwcap() & (1 << cap as u32) != 0
    }

    #[inline]
    pub fn wake_count(&self) -> u32 {
        *self.wake_count.lock()
    }

    /// 固件把 wlan_shared 结构地址写在 RAM 末字；按家族 RAM 布局算出
    /// 该末字的背板地址（控制台读取入口）。
    #[inline]
    pub fn wlan_shared_address(&self) -> u32 {
        PLATFORM_WLAN_RAM_BASE + self.consts.atcm_ram_base + self.consts.chip_ram_size - 4
    }

    /// 增加 wake 请求；0→1 时驱动芯片到可寻址状态。
    /// 对应 WHD_WLAN_KEEP_AWAKE + whd_ensure_wlan_bus_is_up 的组合。
    pub fn keep_awake(&self) -> AxResult<()> {
        let mut count = self.wake_count.lock();
        if *count == 0 {
            self.ensure_bus_is_up()?;
        }
        *count += 1;
        Ok(())
    }

    /// 减少 wake 请求；1→0 时调度向睡眠释放。
    pub fn let_sleep(&self) {
        let mut count = self.wake_count.lock();
        if *count == 0 {
            log::error!(target: "chip::power", "let_sleep: wake count underflow");
            return;
        }
        *count -= 1;
        if *count == 0 {
            if let Err(e) = self.allow_bus_to_sleep() {
                log::warn!(target: "chip::power", "allow_bus_to_sleep err={:?}", e);
            }
        }
    }

    /// 确保 HT 时钟就绪（对应 whd_ensure_wlan_bus_is_up）
    pub fn ensure_bus_is_up(&self) -> AxResult<()> {
        if self.bus.is_up() {
            return Ok(());
        }
        match self.consts.wake_style {
            WakeStyle::BusManaged => {
                self.bus.set_state(true);
                Ok(())
            }
            WakeStyle::ClockGate => {
                // 传统芯片：总线专属唤醒后请求 HT 时钟
                self.bus.wakeup()?;
                self.poll_ht_avail()
            }
            WakeStyle::Kso => {
                if !self.save_restore_enabled() {
                    self.poll_ht_avail()
                } else {
                    match self.kso_enable(true) {
                        Ok(()) => {
                            self.bus.set_state(true);
                            Ok(())
                        }
                        Err(e) => {
                            log::error!(target: "chip::power", "ensure_bus_is_up: KSO wake failed");
                            Err(e)
                        }
                    }
                }
            }
        }
    }

    /// 清除 HT 时钟请求并放行睡眠（对应 whd_allow_wlan_bus_to_sleep）
    pub fn allow_bus_to_sleep(&self) -> AxResult<()> {
        if !self.bus.is_up() {
            return Ok(());
        }
        self.bus.set_state(false);
        match self.consts.wake_style {
            WakeStyle::BusManaged => Ok(()),
            WakeStyle::ClockGate => {
                self.bus
                    .write_register(BusFunction::Backplane, SDIO_CHIP_CLOCK_CSR, 1, 0)?;
                self.bus.sleep()
            }
            WakeStyle::Kso => {
                if !self.save_restore_enabled() {
                    self.bus
                        .write_register(BusFunction::Backplane, SDIO_CHIP_CLOCK_CSR, 1, 0)
                } else {
                    self.kso_enable(false)
                }
            }
        }
    }

    fn poll_ht_avail(&self) -> AxResult<()> {
        self.bus.write_register(
            BusFunction::Backplane,
            SDIO_CHIP_CLOCK_CSR,
            1,
            SBSDIO_HT_AVAIL_REQ as u32,
        )?;
        let mut attempts = WLAN_BUS_UP_ATTEMPTS;
        loop {
            let csr =
                self.bus
                    .read_register(BusFunction::Backplane, SDIO_CHIP_CLOCK_CSR, 1)? as u8;
            if csr & SBSDIO_HT_AVAIL != 0 {
                self.bus.set_state(true);
                return Ok(());
            }
            attempts -= 1;
            if attempts == 0 {
                log::error!(target: "chip::power", "HT clock failed to come up");
                return Err(AxError::BadState);
            }
            self.rtos.delay_ms(HT_AVAIL_WAIT_MS);
        }
    }

    /// KSO（Keep-SDIO-On）置位/清零（对应 whd_kso_enable）
    ///
    /// 置位：写 KEEP_KSO，再冗余写一次（SR 模块唤醒需两次连续写，勘误），
    /// 轮询 sleepCSR 直到 KEEP_KSO|DEVON，最多 64 次、1 ms 间隔。
    /// 清零：写 0 后立即返回——芯片可能已掉电，回读会失败。
    pub fn kso_enable(&self, enable: bool) -> AxResult<()> {
        let write_value: u32 = if enable {
            SBSDIO_SLPCSR_KEEP_WL_KSO as u32
        } else {
            0
        };
        let (compare_value, bmask): (u8, u8);

        if self.consts.kso_double_write_poll_off {
            // 43430/43439 系：置位与清零都双写并轮询，清零只看 KSO 位
            let _ = self
                .bus
                .write_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1, write_value);
            let _ = self
                .bus
                .write_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1, write_value);
            if enable {
                compare_value = SBSDIO_SLPCSR_KEEP_WL_KSO | SBSDIO_SLPCSR_WL_DEVON;
                bmask = compare_value;
            } else {
                compare_value = 0;
                // DEVON 状态位不会立刻清，只比对 KSO 位
                bmask = SBSDIO_SLPCSR_KEEP_WL_KSO;
            }
        } else {
            // 首写可能落在芯片睡眠窗内，不检查返回值
            let _ = self
                .bus
                .write_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1, write_value);
            if !enable {
                // 43012/555x0 清 KSO 后芯片可能立即下电，后续读必失败，直接返回
                return Ok(());
            }
            let _ = self
                .bus
                .write_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1, write_value);
            compare_value = SBSDIO_SLPCSR_KEEP_WL_KSO | SBSDIO_SLPCSR_WL_DEVON;
            bmask = compare_value;
        }

        let mut attempts = MAX_KSO_ATTEMPTS;
        while attempts != 0 {
            if let Ok(read_value) =
                self.bus
                    .read_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1)
            {
                let read_value = read_value as u8;
                if (read_value & bmask) == compare_value && read_value != 0xFF {
                    return Ok(());
                }
            }
            self.rtos.delay_ms(KSO_WAIT_MS);
            let _ = self
                .bus
                .write_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1, write_value);
            attempts -= 1;
        }
        log::error!(target: "chip::power", "kso_enable: sleepCSR never reached 0x{:02x}", compare_value);
        Err(AxError::BadState)
    }

    /// 探测并启用 save/restore（对应 whd_chip_specific_init → whd_enable_save_restore）
    ///
    /// SR 能力固件还需：WakeupCtrl 置 wake-till-ALP/HT、卡能力设 no-cmd-decode，
    /// 使芯片能被总线活动唤醒；随后清时钟请求让芯片入睡（KSO 位单独控睡眠）。
    pub fn enable_save_restore(&self) -> AxResult<()> {
        if self.consts.wake_style == WakeStyle::ClockGate {
            // 传统时钟门控芯片无 SR 引擎
            return Ok(());
        }
        if !self.is_fw_sr_capable()? {
            self.save_restore.store(false, Ordering::Release);
            return Ok(());
        }

        let mut data =
            self.bus
                .read_register(BusFunction::Backplane, SDIO_WAKEUP_CTRL, 1)? as u8;
        data |= if self.consts.wake_till_alp_avail {
            SBSDIO_WCTRL_WL_WAKE_TILL_ALP_AVAIL
        } else {
            SBSDIO_WCTRL_WL_WAKE_TILL_HT_AVAIL
        };
        self.bus
            .write_register(BusFunction::Backplane, SDIO_WAKEUP_CTRL, 1, data as u32)?;

        // 卡能力 no-cmd-decode：cmd 线一有活动 sdiod_aos 即唤醒 host 侧
        self.bus.write_register(
            BusFunction::Bus,
            SDIOD_CCCR_BRCM_CARDCAP,
            1,
            SDIOD_CCCR_BRCM_CARDCAP_CMD_NODEC,
        )?;

        let clk_req = if self.consts.wake_till_alp_avail {
            SBSDIO_HT_AVAIL_REQ
        } else {
            SBSDIO_FORCE_HT
        };
        self.bus.write_register(
            BusFunction::Backplane,
            SDIO_CHIP_CLOCK_CSR,
            1,
            clk_req as u32,
        )?;

        let slpcsr =
            self.bus
                .read_register(BusFunction::Backplane, SDIO_SLEEP_CSR, 1)? as u8;
        if slpcsr & SBSDIO_SLPCSR_KEEP_WL_KSO == 0 {
            self.bus.write_register(
                BusFunction::Backplane,
                SDIO_SLEEP_CSR,
                1,
                (slpcsr | SBSDIO_SLPCSR_KEEP_WL_KSO) as u32,
            )?;
        }

        self.bus.sleep()?;
        self.bus
            .write_register(BusFunction::Backplane, SDIO_PULL_UP, 1, 0xF)?;
        self.save_restore.store(true, Ordering::Release);
        log::info!(target: "chip::power", "save/restore enabled, chip 0x{:x}", self.chip_id);
        Ok(())
    }

    /// SR 引擎是否由固件初始化（对应 whd_is_fw_sr_capable）
    fn is_fw_sr_capable(&self) -> AxResult<bool> {
        if self.consts.sr_always_on {
            // DM/安全芯片 host 读不到 PMU SR 寄存器，恒视为具备
            return Ok(true);
        }
        if self.consts.kso_double_write_poll_off {
            let srctrl = self.bus.read_backplane(CHIPCOMMON_SR_CONTROL1, 4)?;
            return Ok(srctrl != 0);
        }
        let capext = self.bus.read_backplane(CHIPCOMMON_CORE_CAPEXT_ADDR, 4)?;
        if capext & CHIPCOMMON_CORE_CAPEXT_SR_SUPPORTED == 0 {
            return Ok(false);
        }
        let retention = self.bus.read_backplane(CHIPCOMMON_CORE_RETENTION_CTL, 4)?;
        Ok(retention & (RCTL_MACPHY_DISABLE | RCTL_LOGIC_DISABLE) == 0)
    }
}
