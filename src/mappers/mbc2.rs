/*!
MBC2 controller.

A single ROM-side register window at 0x0000..=0x3FFF does double duty,
demultiplexed by address bit 8: with the bit set, the write selects the
4-bit ROM bank (0 maps to 1); with it clear, the write gates the built-in
RAM (low nibble == 0xA enables). The chip carries its own 512-entry
half-byte RAM, mapped through the low 9 address bits of the external RAM
window.
*/

use crate::log::Logger;
use crate::mapper::Mapper;

pub struct Mbc2 {
    rom: Vec<u8>,
    ram: [u8; 512],
    ram_enabled: bool,
    bank: u8,
    log: Logger,
}

impl Mbc2 {
    pub fn new(rom: Vec<u8>, log: Logger) -> Self {
        Self {
            rom,
            ram: [0; 512],
            ram_enabled: false,
            bank: 1,
            log,
        }
    }
}

impl Mapper for Mbc2 {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom[addr as usize % self.rom.len()],
            0x4000..=0x7FFF => {
                let index = ((u32::from(self.bank) << 14) | u32::from(addr & 0x3FFF)) as usize;
                self.rom[index % self.rom.len()]
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled {
                    self.log
                        .error(format_args!("built-in RAM read while disabled"));
                    0xFF
                } else {
                    self.ram[usize::from(addr & 0x1FF)]
                }
            }
            _ => {
                self.log
                    .error(format_args!("mapper read outside windows: 0x{addr:04X}"));
                0xFF
            }
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x7FFF => {
                if addr & 0x0100 != 0 {
                    let masked = value & 0x0F;
                    self.bank = if masked != 0 { masked } else { 1 };
                } else {
                    self.ram_enabled = (value & 0x0F) == 0x0A;
                }
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled {
                    self.log
                        .error(format_args!("built-in RAM write while disabled"));
                } else {
                    self.ram[usize::from(addr & 0x1FF)] = value & 0x0F;
                }
            }
            _ => {
                self.log
                    .error(format_args!("mapper write outside windows: 0x{addr:04X}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banked_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * 0x4000];
        for (bank, chunk) in rom.chunks_mut(0x4000).enumerate() {
            chunk.fill(bank as u8);
        }
        rom
    }

    #[test]
    fn address_bit_8_selects_register() {
        let mut mbc = Mbc2::new(banked_rom(16), Logger::null());
        // Bit 8 set: ROM bank select.
        mbc.write(0x0100, 3);
        assert_eq!(mbc.read(0x4000), 3);
        // Bit 8 clear: RAM gate, bank unchanged.
        mbc.write(0x0000, 0x0A);
        assert_eq!(mbc.read(0x4000), 3);
    }

    #[test]
    fn bank_zero_maps_to_one() {
        let mut mbc = Mbc2::new(banked_rom(16), Logger::null());
        mbc.write(0x0100, 0);
        assert_eq!(mbc.read(0x4000), 1);
    }

    #[test]
    fn ram_stores_nibbles_behind_enable() {
        let mut mbc = Mbc2::new(banked_rom(4), Logger::null());
        assert_eq!(mbc.read(0xA000), 0xFF);

        mbc.write(0x0000, 0x0A);
        mbc.write(0xA1FF, 0x3C);
        assert_eq!(mbc.read(0xA1FF), 0x0C); // only the low nibble is kept
        // Addresses wrap on the low nine bits.
        assert_eq!(mbc.read(0xA3FF), 0x0C);
    }
}
