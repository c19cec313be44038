//! DS1（deep-sleep-1）退出握手
//!
//! 对应 whd_chip.c whd_wlan_bus_complete_ds_wake（43012 路径）：唤醒序列
//! 读写 D11 共享内存、轮询 M_DS1_CTRL_SDIO 的 proc-done 位（最多 50 次、
//! 每次 100 ms），最后回写 PMU_MINRESMASK。仅在家族标记 ds1_capable 时
//! 由互锁调用，不在快路径上。

use axerrno::{AxError, AxResult};

use crate::bus::BusOps;
use crate::power::WlanChip;
use crate::regs::*;
use crate::rtos::Rtos;

impl WlanChip {
    /// 强制 D11 MAC 醒来（对应 whd_wlan_wake_from_host）
    pub fn wake_from_host(&self) -> AxResult<()> {
        let val = self
            .bus
            .read_backplane(D11_MACCONTROL_REG, D11_MACCONTROL_REG_SIZE)?;
        self.bus.write_backplane(
            D11_MACCONTROL_REG,
            D11_MACCONTROL_REG_SIZE,
            val | D11_MACCONTROL_REG_WAKE,
        )?;
        Ok(())
    }

    /// 完成 DS1 退出（对应 whd_wlan_bus_complete_ds_wake）
    ///
    /// - `wake_from_firmware`：固件主动唤醒（TRUE）或 host 发起（FALSE）
    /// - `ctrl_addr`：M_DS1_CTRL_SDIO 共享内存地址（平台在 DS1 进入时记录）
    ///
    /// 线性序列：host 发起时先置 DS1_EXIT|REQ_VALID 并强制 MAC 醒来，
    /// 然后轮询 proc-done，最后恢复 PMU 最小资源掩码。
    pub fn complete_ds1_wake(&self, wake_from_firmware: bool, ctrl_addr: u32) -> AxResult<()> {
        if !self.consts().ds1_capable {
            return Ok(());
        }

        if !wake_from_firmware {
            let mut ctrl = self.bus.read_backplane(ctrl_addr, 4)?;
            ctrl |= C_DS1_CTRL_SDIO_DS1_EXIT | C_DS1_CTRL_REQ_VALID;
            self.bus.write_backplane(ctrl_addr, 4, ctrl)?;
            self.wake_from_host()?;
        }

        let mut polls = DS1_EXIT_MAX_POLLS;
        loop {
            let ctrl = self.bus.read_backplane(ctrl_addr, 4)?;
            if ctrl & C_DS1_CTRL_PROC_DONE != 0 {
                break;
            }
            polls -= 1;
            if polls == 0 {
                log::error!(target: "chip::ds1", "DS1 exit: proc-done never observed (ctrl=0x{:08x})", ctrl);
                return Err(AxError::BadState);
            }
            self.rtos.delay_ms(DS1_EXIT_POLL_MS);
        }

        self.bus
            .write_backplane(PMU_MINRESMASK_ADDR, 4, self.consts().pmu_min_res_mask)?;
        log::debug!(target: "chip::ds1", "DS1 exit complete, minresmask restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::testutil::{FakeBus, FakeRtos};
    use crate::power::WlanChip;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU32, Ordering};

    /// proc-done 在第 N 次读后出现的背板假实现
    struct Ds1Bus {
        inner: Arc<FakeBus>,
        reads_left: AtomicU32,
        minres_written: AtomicU32,
    }

    impl crate::bus::BusOps for Ds1Bus {
        fn read_register(
            &self,
            f: crate::bus::BusFunction,
            a: u32,
            n: u8,
        ) -> axerrno::AxResult<u32> {
            self.inner.read_register(f, a, n)
        }
        fn write_register(
            &self,
            f: crate::bus::BusFunction,
            a: u32,
            n: u8,
            v: u32,
        ) -> axerrno::AxResult<()> {
            self.inner.write_register(f, a, n, v)
        }
        fn read_backplane(&self, _a: u32, _n: u8) -> axerrno::AxResult<u32> {
            if self.reads_left.fetch_sub(1, Ordering::Relaxed) <= 1 {
                Ok(C_DS1_CTRL_PROC_DONE)
            } else {
                Ok(0)
            }
        }
        fn write_backplane(&self, a: u32, _n: u8, v: u32) -> axerrno::AxResult<()> {
            if a == PMU_MINRESMASK_ADDR {
                self.minres_written.store(v, Ordering::Relaxed);
            }
            Ok(())
        }
        fn transfer_backplane_bytes(
            &self,
            d: crate::bus::BusDir,
            a: u32,
            b: &mut [u8],
        ) -> axerrno::AxResult<()> {
            self.inner.transfer_backplane_bytes(d, a, b)
        }
        fn send_buffer(&self, f: &[u8]) -> axerrno::AxResult<()> {
            self.inner.send_buffer(f)
        }
        fn wakeup(&self) -> axerrno::AxResult<()> {
            Ok(())
        }
        fn sleep(&self) -> axerrno::AxResult<()> {
            Ok(())
        }
        fn is_up(&self) -> bool {
            self.inner.is_up()
        }
        fn set_state(&self, up: bool) {
            self.inner.set_state(up)
        }
    }

    #[test]
    fn ds1_exit_polls_until_proc_done() {
        let bus = Arc::new(Ds1Bus {
            inner: FakeBus::new(),
            reads_left: AtomicU32::new(5),
            minres_written: AtomicU32::new(0),
        });
        let chip = WlanChip::new(bus.clone(), FakeRtos::new(), 43012);
        chip.complete_ds1_wake(true, 0x0066_0000).unwrap();
        assert_eq!(
            bus.minres_written.load(Ordering::Relaxed),
            DEFAULT_43012_MIN_RES_MASK
        );
    }

    #[test]
    fn ds1_exit_is_noop_without_capability() {
        let bus = Arc::new(Ds1Bus {
            inner: FakeBus::new(),
            reads_left: AtomicU32::new(u32::MAX),
            minres_written: AtomicU32::new(0),
        });
        let chip = WlanChip::new(bus.clone(), FakeRtos::new(), 0x4373);
        chip.complete_ds1_wake(false, 0x0066_0000).unwrap();
        assert_eq!(bus.minres_written.load(Ordering::Relaxed), 0);
    }
}
