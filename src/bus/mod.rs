/*!
Bus module: the UNIBUS address space facade and its submodules.

Overview
- `Unibus` multiplexes core memory with memory-mapped peripheral
  registers in one flat 18-bit physical address space. Addresses below
  the configured memory size resolve to RAM; everything else is offered
  to the peripherals in a fixed probe order — MMU control window first,
  then disk, console, clock — until one claims it.
- A transaction nobody claims is a typed fault, split by address: below
  the I/O window it is a `Timeout` (the CPU traps on those), inside the
  I/O window it is `Unmapped` (fatal to the driver).
- Word transfers must be even-aligned; byte transfers ride on the word
  path via the `AddressSpace` default methods.

Modules and responsibilities
- interfaces: `AddressSpace` and `BusDevice` seam traits.
- ram: word-organized core memory.

Disk DMA
- The RK controller stages transfers instead of reaching back into the
  bus that owns it; `write_word` drains staged transfers after the
  claiming write completes, storing words through the normal dispatch
  path.
*/

pub mod interfaces;
pub mod ram;

pub use interfaces::{AddressSpace, BusDevice};
pub use ram::{DEFAULT_MEMORY_SIZE, Ram};

use crate::devices::{LineClock, RkDisk, Teletype};
use crate::diag::{DiagHandle, null_diag};
use crate::fault::MemoryFault;
use crate::mmu::{IO_PAGE_BASE, Mmu};

/// The UNIBUS: core memory plus the peripheral probe chain.
pub struct Unibus {
    ram: Ram,
    pub mmu: Mmu,
    pub rk: RkDisk,
    pub tt: Teletype,
    pub kw: LineClock,
    diag: DiagHandle,
}

impl Unibus {
    /// Bus with the default memory size and silent diagnostics.
    pub fn new() -> Self {
        Self::with_diagnostics(null_diag())
    }

    pub fn with_diagnostics(diag: DiagHandle) -> Self {
        Self::with_memory_size(DEFAULT_MEMORY_SIZE, diag)
    }

    /// Bus with `memory_size` bytes of RAM below the device space.
    pub fn with_memory_size(memory_size: u32, diag: DiagHandle) -> Self {
        assert!(
            memory_size <= IO_PAGE_BASE,
            "memory cannot overlap the I/O page"
        );
        Self {
            ram: Ram::new(memory_size),
            mmu: Mmu::new(diag.clone()),
            rk: RkDisk::new(diag.clone()),
            tt: Teletype::new(diag.clone()),
            kw: LineClock::new(diag.clone()),
            diag,
        }
    }

    /// Bytes of RAM configured below the device space.
    #[inline]
    pub fn memory_size(&self) -> u32 {
        self.ram.size_bytes()
    }

    /// Full power-up reset: memory and every device.
    pub fn reset(&mut self) {
        self.ram.reset();
        self.mmu.reset();
        self.io_reset();
    }

    /// Peripheral-only reset, as performed by the RESET instruction.
    pub fn io_reset(&mut self) {
        self.diag.info("UNIBUS RESET");
        self.rk.reset();
        self.tt.reset();
        self.kw.reset();
    }

    fn unresolved(addr: u32) -> MemoryFault {
        if addr < IO_PAGE_BASE {
            MemoryFault::Timeout { address: addr }
        } else {
            MemoryFault::Unmapped { address: addr }
        }
    }

    /// Carry out transfers the RK controller staged during a register
    /// write. Words go through the normal dispatch path, so a transfer
    /// can land anywhere a program could store to.
    fn run_pending_disk_transfers(&mut self) -> Result<(), MemoryFault> {
        while let Some(transfer) = self.rk.take_transfer() {
            let mut addr = transfer.bus_addr;
            for word in transfer.words {
                self.write_word(addr as u32, word)?;
                addr = addr.wrapping_add(2);
            }
        }
        Ok(())
    }
}

impl Default for Unibus {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace for Unibus {
    fn read_word(&mut self, addr: u32) -> Result<u16, MemoryFault> {
        if addr & 1 != 0 {
            return Err(MemoryFault::Misaligned { address: addr });
        }
        if self.ram.contains(addr) {
            return Ok(self.ram.read(addr));
        }
        self.mmu
            .read(addr)
            .or_else(|| self.rk.read(addr))
            .or_else(|| self.tt.read(addr))
            .or_else(|| self.kw.read(addr))
            .ok_or_else(|| Self::unresolved(addr))
    }

    fn write_word(&mut self, addr: u32, data: u16) -> Result<(), MemoryFault> {
        if addr & 1 != 0 {
            return Err(MemoryFault::Misaligned { address: addr });
        }
        if self.ram.contains(addr) {
            self.ram.write(addr, data);
            return Ok(());
        }
        let claimed = self.mmu.write(addr, data)
            || self.rk.write(addr, data)
            || self.tt.write(addr, data)
            || self.kw.write(addr, data);
        if !claimed {
            return Err(Self::unresolved(addr));
        }
        self.run_pending_disk_transfers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::kw::LKS_ADDRESS;
    use crate::devices::rk::{RKBA_ADDRESS, RKCS_ADDRESS, RKDA_ADDRESS, RKWC_ADDRESS};

    #[test]
    fn ram_read_write() {
        let mut bus = Unibus::new();
        bus.write_word(0o1000, 0o123456).unwrap();
        assert_eq!(bus.read_word(0o1000).unwrap(), 0o123456);
    }

    #[test]
    fn byte_access_rides_on_words() {
        let mut bus = Unibus::new();
        bus.write_word(0o2000, 0x0000).unwrap();
        bus.write_byte(0o2000, 0x34).unwrap();
        bus.write_byte(0o2001, 0x12).unwrap();
        assert_eq!(bus.read_word(0o2000).unwrap(), 0x1234);
        assert_eq!(bus.read_byte(0o2001).unwrap(), 0x12);
    }

    #[test]
    fn odd_word_access_is_misaligned() {
        let mut bus = Unibus::new();
        assert_eq!(
            bus.read_word(0o1001),
            Err(MemoryFault::Misaligned { address: 0o1001 })
        );
        assert_eq!(
            bus.write_word(0o1001, 0),
            Err(MemoryFault::Misaligned { address: 0o1001 })
        );
    }

    #[test]
    fn gap_below_io_window_times_out() {
        // 8 KiB machine: everything between RAM top and the I/O page
        // is open bus.
        let mut bus = Unibus::with_memory_size(0o20000, null_diag());
        assert_eq!(
            bus.read_word(0o20000),
            Err(MemoryFault::Timeout { address: 0o20000 })
        );
        assert_eq!(
            bus.write_word(0o100000, 1),
            Err(MemoryFault::Timeout { address: 0o100000 })
        );
    }

    #[test]
    fn unclaimed_io_page_address_is_unmapped() {
        let mut bus = Unibus::new();
        assert_eq!(
            bus.read_word(0o777000),
            Err(MemoryFault::Unmapped { address: 0o777000 })
        );
    }

    #[test]
    fn device_windows_are_reachable() {
        let mut bus = Unibus::new();
        // MMU control window probed first.
        bus.write_word(0o777572, 1).unwrap();
        assert_eq!(bus.read_word(0o777572).unwrap(), 1);
        // Clock register at the far end of the chain.
        bus.write_word(LKS_ADDRESS, 0x40).unwrap();
        assert_eq!(bus.read_word(LKS_ADDRESS).unwrap(), 0x40);
    }

    #[test]
    fn disk_transfer_lands_in_ram() {
        let mut bus = Unibus::new();
        let image: Vec<u8> = [0o111u16, 0o222, 0o333]
            .iter()
            .flat_map(|w| [(*w & 0xff) as u8, (*w >> 8) as u8])
            .collect();
        bus.rk.mount(&image);

        bus.write_word(RKWC_ADDRESS, (0x10000u32 - 3) as u16).unwrap();
        bus.write_word(RKBA_ADDRESS, 0o4000).unwrap();
        bus.write_word(RKDA_ADDRESS, 0).unwrap();
        bus.write_word(RKCS_ADDRESS, 0o5).unwrap(); // READ | GO

        assert_eq!(bus.read_word(0o4000).unwrap(), 0o111);
        assert_eq!(bus.read_word(0o4002).unwrap(), 0o222);
        assert_eq!(bus.read_word(0o4004).unwrap(), 0o333);
    }

    #[test]
    fn io_reset_clears_devices_but_not_ram() {
        let mut bus = Unibus::new();
        bus.write_word(0o1000, 0o7777).unwrap();
        bus.write_word(LKS_ADDRESS, 0x40).unwrap();
        bus.io_reset();
        assert_eq!(bus.read_word(0o1000).unwrap(), 0o7777);
        assert_eq!(bus.read_word(LKS_ADDRESS).unwrap(), 0);
    }
}
