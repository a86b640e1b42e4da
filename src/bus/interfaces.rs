/*!
Bus seam traits.

`AddressSpace` is the CPU-facing contract for the flat UNIBUS address
space: word-granular transfers that either succeed or produce a typed
`MemoryFault`. Byte access is defined here once, in terms of the word
path, so no implementation ever invents a second byte-level protocol —
a byte read picks one half of the containing word and a byte write is a
read-modify-write of it.

`BusDevice` is the contract peripheral register windows implement: a
device either claims an address (returning/accepting a word) or declines
it so the bus can offer the address to the next device in the probe
order.
*/

use crate::fault::MemoryFault;

/// Flat 18-bit address space with word-granular transfers.
pub trait AddressSpace {
    /// Read one 16-bit word. `addr` must be even.
    fn read_word(&mut self, addr: u32) -> Result<u16, MemoryFault>;

    /// Write one 16-bit word. `addr` must be even.
    fn write_word(&mut self, addr: u32, data: u16) -> Result<(), MemoryFault>;

    /// Read one byte, derived from the containing word.
    fn read_byte(&mut self, addr: u32) -> Result<u8, MemoryFault> {
        let word = self.read_word(addr & !1)?;
        if addr & 1 == 0 {
            Ok((word & 0x00ff) as u8)
        } else {
            Ok((word >> 8) as u8)
        }
    }

    /// Write one byte as a read-modify-write of the containing word.
    fn write_byte(&mut self, addr: u32, data: u8) -> Result<(), MemoryFault> {
        let aligned = addr & !1;
        let word = self.read_word(aligned)?;
        let merged = if addr & 1 == 0 {
            (word & 0xff00) | data as u16
        } else {
            (word & 0x00ff) | ((data as u16) << 8)
        };
        self.write_word(aligned, merged)
    }
}

/// A peripheral register window on the bus.
///
/// Devices see only word transfers; the bus has already normalized byte
/// traffic through the word path above.
pub trait BusDevice {
    /// Return to the power-up register state.
    fn reset(&mut self);

    /// Claim a read of `addr`, or `None` to let the probe continue.
    fn read(&mut self, addr: u32) -> Option<u16>;

    /// Claim a write of `addr`, returning whether the device took it.
    fn write(&mut self, addr: u32, data: u16) -> bool;
}
