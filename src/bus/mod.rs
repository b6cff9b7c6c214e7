/*!
Bus arbiter: owns working RAM, video RAM, object RAM and high RAM, and
routes every read/write to the owning component by address.

Address map (fixed, never reconfigured):
- 0x0000-0x7FFF: cartridge ROM (mapper collaborator)
- 0x8000-0x9FFF: video RAM (8 KiB)
- 0xA000-0xBFFF: external RAM (mapper collaborator)
- 0xC000-0xDFFF: working RAM (8 KiB)
- 0xE000-0xFDFF: echo of working RAM (lower 13 address bits)
- 0xFE00-0xFE9F: object RAM (160 bytes)
- 0xFEA0-0xFEFF: unusable gap (always invalid)
- 0xFF00-0xFF7F: IO registers, sub-dispatched to joypad, serial, timer,
  interrupt-pending, audio, pixel pipeline, transfer unit, boot lock
- 0xFF80-0xFFFE: high RAM (127 bytes)
- 0xFFFF:        interrupt enable

Every access carries a requester role. Video RAM refuses the CPU during
pixel transfer; object RAM refuses it during object search and pixel
transfer; and while a block transfer is active the CPU is locked out of all
memory regions except high RAM, the IO window and the interrupt-enable byte
(the transfer unit itself accesses object RAM under the DMA role). A
refused or undecoded access reads back 0xFF and logs through the injected
sink; nothing here is ever fatal, and the machine keeps running on sentinel
bytes exactly as the real bus floats high.
*/

pub mod clock;
pub mod dma;
pub mod interrupts;
pub mod serial;

#[cfg(test)]
mod tests;

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::joypad::{Button, Joypad};
use crate::log::Logger;
use crate::ppu::{Mode, Ppu};
use crate::timer::Timer;
use dma::DmaUnit;
use interrupts::InterruptLine;
use serial::Serial;

pub const WRAM_SIZE: usize = 0x2000;
pub const VRAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;
pub const HRAM_SIZE: usize = 0x7F;

pub const OAM_START: u16 = 0xFE00;

/// Who is asking. Some regions enforce rules conditioned on the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Cpu,
    Ppu,
    Dma,
}

pub struct Bus {
    wram: [u8; WRAM_SIZE],
    pub(crate) vram: [u8; VRAM_SIZE],
    pub(crate) oam: [u8; OAM_SIZE],
    hram: [u8; HRAM_SIZE],

    pub ppu: Ppu,
    pub timer: Timer,
    pub apu: Apu,
    pub serial: Serial,
    pub joypad: Joypad,
    pub(crate) dma: DmaUnit,
    pub intr: InterruptLine,

    pub cartridge: Option<Cartridge>,
    boot_rom_locked: bool,
    log: Logger,
}

impl Bus {
    pub fn new(log: Logger) -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            hram: [0; HRAM_SIZE],
            ppu: Ppu::new(log.clone()),
            timer: Timer::new(log.clone()),
            apu: Apu::new(log.clone()),
            serial: Serial::new(),
            joypad: Joypad::new(),
            dma: DmaUnit::new(),
            intr: InterruptLine::new(),
            cartridge: None,
            boot_rom_locked: false,
            log,
        }
    }

    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = Some(cartridge);
    }

    /// Front-end button edge; may raise the joypad interrupt.
    pub fn button_event(&mut self, button: Button, pressed: bool) {
        self.joypad.button_event(button, pressed, &mut self.intr);
    }

    /// CPU locked out of a memory region by an active block transfer.
    #[inline]
    fn dma_blocks(&self, requester: Access) -> bool {
        requester == Access::Cpu && self.dma.is_active()
    }

    pub fn read(&self, addr: u16, requester: Access) -> u8 {
        match addr {
            0x0000..=0x7FFF => {
                if self.dma_blocks(requester) {
                    self.log
                        .error(format_args!("ROM read at 0x{addr:04X} during block transfer"));
                    return 0xFF;
                }
                self.cartridge_read(addr)
            }
            0x8000..=0x9FFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "video RAM read at 0x{addr:04X} during block transfer"
                    ));
                    return 0xFF;
                }
                if requester == Access::Cpu && self.ppu.mode() == Mode::PixelTransfer {
                    self.log.error(format_args!(
                        "video RAM read at 0x{addr:04X} during pixel transfer"
                    ));
                    return 0xFF;
                }
                self.vram[(addr as usize) & 0x1FFF]
            }
            0xA000..=0xBFFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "external RAM read at 0x{addr:04X} during block transfer"
                    ));
                    return 0xFF;
                }
                self.cartridge_read(addr)
            }
            0xC000..=0xDFFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "working RAM read at 0x{addr:04X} during block transfer"
                    ));
                    return 0xFF;
                }
                self.wram[(addr as usize) & 0x1FFF]
            }
            0xE000..=0xFDFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "echo RAM read at 0x{addr:04X} during block transfer"
                    ));
                    return 0xFF;
                }
                // Alias of working RAM through the lower 13 address bits.
                self.wram[(addr as usize) & 0x1FFF]
            }
            0xFE00..=0xFE9F => {
                if requester == Access::Cpu {
                    if self.dma.is_active() {
                        self.log.error(format_args!(
                            "object RAM read at 0x{addr:04X} during block transfer"
                        ));
                        return 0xFF;
                    }
                    if matches!(self.ppu.mode(), Mode::OamSearch | Mode::PixelTransfer) {
                        self.log.error(format_args!(
                            "object RAM read at 0x{addr:04X} during object search/pixel transfer"
                        ));
                        return 0xFF;
                    }
                }
                self.oam[(addr - OAM_START) as usize]
            }
            0xFEA0..=0xFEFF => {
                self.log
                    .error(format_args!("read from unusable area at 0x{addr:04X}"));
                0xFF
            }
            0xFF00..=0xFF7F => self.read_io(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.intr.read_enable(),
        }
    }

    pub fn write(&mut self, addr: u16, value: u8, requester: Access) {
        match addr {
            0x0000..=0x7FFF => {
                if self.dma_blocks(requester) {
                    self.log
                        .error(format_args!("ROM write at 0x{addr:04X} during block transfer"));
                    return;
                }
                self.cartridge_write(addr, value);
            }
            0x8000..=0x9FFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "video RAM write at 0x{addr:04X} during block transfer"
                    ));
                    return;
                }
                if requester == Access::Cpu && self.ppu.mode() == Mode::PixelTransfer {
                    self.log.error(format_args!(
                        "video RAM write at 0x{addr:04X} during pixel transfer"
                    ));
                    return;
                }
                self.vram[(addr as usize) & 0x1FFF] = value;
            }
            0xA000..=0xBFFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "external RAM write at 0x{addr:04X} during block transfer"
                    ));
                    return;
                }
                self.cartridge_write(addr, value);
            }
            0xC000..=0xDFFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "working RAM write at 0x{addr:04X} during block transfer"
                    ));
                    return;
                }
                self.wram[(addr as usize) & 0x1FFF] = value;
            }
            0xE000..=0xFDFF => {
                if self.dma_blocks(requester) {
                    self.log.error(format_args!(
                        "echo RAM write at 0x{addr:04X} during block transfer"
                    ));
                    return;
                }
                self.wram[(addr as usize) & 0x1FFF] = value;
            }
            0xFE00..=0xFE9F => {
                if requester == Access::Cpu {
                    if self.dma.is_active() {
                        self.log.error(format_args!(
                            "object RAM write at 0x{addr:04X} during block transfer"
                        ));
                        return;
                    }
                    if matches!(self.ppu.mode(), Mode::OamSearch | Mode::PixelTransfer) {
                        self.log.error(format_args!(
                            "object RAM write at 0x{addr:04X} during object search/pixel transfer"
                        ));
                        return;
                    }
                }
                self.oam[(addr - OAM_START) as usize] = value;
            }
            0xFEA0..=0xFEFF => {
                self.log
                    .error(format_args!("write to unusable area at 0x{addr:04X}"));
            }
            0xFF00..=0xFF7F => self.write_io(addr, value),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = value,
            0xFFFF => self.intr.write_enable(value),
        }
    }

    fn read_io(&self, addr: u16) -> u8 {
        match addr {
            0xFF00 => self.joypad.read(),
            0xFF01..=0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.intr.read_pending(),
            0xFF10..=0xFF3F => self.apu.read(addr),
            0xFF46 => self.dma.source_page(),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF50 => 0xFF, // boot-lock latch reads back high
            _ => {
                self.log
                    .error(format_args!("read from undecoded IO address 0x{addr:04X}"));
                0xFF
            }
        }
    }

    fn write_io(&mut self, addr: u16, value: u8) {
        match addr {
            0xFF00 => self.joypad.write(value),
            0xFF01..=0xFF02 => self.serial.write(addr, value),
            0xFF04..=0xFF07 => self.timer.write(addr, value),
            0xFF0F => self.intr.write_pending(value),
            0xFF10..=0xFF3F => self.apu.write(addr, value),
            0xFF46 => self.dma.request(value),
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, value),
            0xFF50 => {
                if value & 0x01 != 0 && !self.boot_rom_locked {
                    self.boot_rom_locked = true;
                    self.log.info(format_args!("boot ROM locked out"));
                }
            }
            _ => {
                self.log
                    .error(format_args!("write to undecoded IO address 0x{addr:04X}"));
            }
        }
    }

    fn cartridge_read(&self, addr: u16) -> u8 {
        match &self.cartridge {
            Some(cartridge) => cartridge.read(addr),
            None => {
                self.log
                    .error(format_args!("cartridge read at 0x{addr:04X} with no cartridge"));
                0xFF
            }
        }
    }

    fn cartridge_write(&mut self, addr: u16, value: u8) {
        match &mut self.cartridge {
            Some(cartridge) => cartridge.write(addr, value),
            None => {
                self.log.error(format_args!(
                    "cartridge write at 0x{addr:04X} with no cartridge"
                ));
            }
        }
    }
}
