/*!
Peripheral devices living on the UNIBUS I/O page.

Each device implements `BusDevice` and claims its own register window;
the bus probes them in a fixed order after the MMU control window. Only
register-level behavior is modeled — enough for a kernel to boot from
disk, talk to a console, and take clock interrupts.

- rk: RK11 disk controller (block reads from a mounted image)
- tt: console teletype (output sink, input queue)
- kw: KW11-L line clock (status register + interrupt request)
*/

pub mod kw;
pub mod rk;
pub mod tt;

pub use kw::LineClock;
pub use rk::RkDisk;
pub use tt::Teletype;
