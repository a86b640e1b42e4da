/*!
RK11 disk controller.

Register window (I/O page):

    0o777400  RKDS  drive status
    0o777402  RKER  error
    0o777404  RKCS  control/status (bit 0 = GO, bits 1-3 = function)
    0o777406  RKWC  word count (two's complement)
    0o777410  RKBA  bus address
    0o777412  RKDA  disk address

Writing RKCS with GO and the READ function queues a transfer of
`0x10000 - RKWC` words from the mounted image into the bus address
space. The controller cannot reach back into the bus that owns it, so it
stages the source words and the target address as a `PreparedRead`; the
bus collects it with `take_transfer` and performs the actual stores.
Register state (RKBA/RKDA/RKWC) is advanced to its post-transfer values
when the transfer is staged, matching the controller's appearance after
a completed operation.

Only the READ function is implemented; other functions set ready and are
reported through diagnostics.
*/

use crate::bus::interfaces::BusDevice;
use crate::diag::DiagHandle;

pub const RKDS_ADDRESS: u32 = 0o777400;
pub const RKER_ADDRESS: u32 = 0o777402;
pub const RKCS_ADDRESS: u32 = 0o777404;
pub const RKWC_ADDRESS: u32 = 0o777406;
pub const RKBA_ADDRESS: u32 = 0o777410;
pub const RKDA_ADDRESS: u32 = 0o777412;

const FUNCTION_MASK: u16 = 0x0e;
const FUNCTION_READ: u16 = 4;
const CONTROL_GO: u16 = 1;
const STATUS_READY: u16 = 0x0080;

/// A staged disk-to-memory transfer for the bus to carry out.
pub struct PreparedRead {
    /// First bus address to store into (steps by 2, wrapping at 16 bits).
    pub bus_addr: u16,
    /// Source words copied out of the image.
    pub words: Vec<u16>,
}

/// RK11 controller state plus the mounted disk image.
pub struct RkDisk {
    rkds: u16,
    rker: u16,
    rkcs: u16,
    rkwc: u16,
    rkba: u16,
    rkda: u16,
    image: Option<Vec<u16>>,
    pending: Option<PreparedRead>,
    diag: DiagHandle,
}

impl RkDisk {
    pub fn new(diag: DiagHandle) -> Self {
        Self {
            rkds: 0,
            rker: 0,
            rkcs: 0,
            rkwc: 0,
            rkba: 0,
            rkda: 0,
            image: None,
            pending: None,
            diag,
        }
    }

    /// Mount a disk image given as raw bytes (little-endian words).
    pub fn mount(&mut self, image: &[u8]) {
        if image.is_empty() {
            self.diag.error("RK: invalid disk image");
        }
        let words = image
            .chunks(2)
            .map(|pair| {
                let low = pair[0] as u16;
                let high = *pair.get(1).unwrap_or(&0) as u16;
                (high << 8) | low
            })
            .collect();
        self.image = Some(words);
    }

    /// Collect a staged transfer, if a GO/READ command produced one.
    pub fn take_transfer(&mut self) -> Option<PreparedRead> {
        self.pending.take()
    }

    fn start_function(&mut self, function: u16) {
        if function != FUNCTION_READ {
            self.diag.warn("RK: unimplemented function");
            return;
        }
        let count = 0x10000 - self.rkwc as u32;
        self.diag.info(&format!(
            "RK READ {count} words, bus {:#08o}, disk {:#08o}",
            self.rkba, self.rkda
        ));
        let Some(image) = &self.image else {
            self.diag.error("RK READ with no image mounted");
            return;
        };
        let start = (self.rkda >> 1) as usize;
        let words = (0..count as usize)
            .map(|i| image.get(start + i).copied().unwrap_or(0))
            .collect();
        self.pending = Some(PreparedRead {
            bus_addr: self.rkba,
            words,
        });
        // Registers advance as the hardware leaves them after completion.
        self.rkba = (self.rkba as u32 + 2 * count) as u16;
        self.rkda = (self.rkda as u32 + 2 * count) as u16;
        self.rkwc = 0;
    }
}

impl BusDevice for RkDisk {
    fn reset(&mut self) {
        self.rkds = 0;
        self.rker = 0;
        self.rkcs = 0;
        self.rkwc = 0;
        self.rkba = 0;
        self.rkda = 0;
        self.pending = None;
        // The mounted image survives a bus reset.
    }

    fn read(&mut self, addr: u32) -> Option<u16> {
        match addr {
            RKDS_ADDRESS => {
                self.rkds |= STATUS_READY;
                Some(self.rkds)
            }
            RKER_ADDRESS => Some(self.rker),
            RKCS_ADDRESS => {
                self.rkcs |= STATUS_READY;
                Some(self.rkcs)
            }
            _ => None,
        }
    }

    fn write(&mut self, addr: u32, data: u16) -> bool {
        match addr {
            RKCS_ADDRESS => {
                let mut stored = data;
                if data & CONTROL_GO != 0 {
                    stored &= !CONTROL_GO;
                    self.start_function(data & FUNCTION_MASK);
                }
                self.rkcs = stored;
            }
            RKWC_ADDRESS => self.rkwc = data,
            RKBA_ADDRESS => self.rkba = data,
            RKDA_ADDRESS => self.rkda = data,
            _ => return false,
        }
        true
    }
}
