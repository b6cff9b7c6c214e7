/*!
Cartridge image loading: header parse, checksum validation, and controller
selection.

The 0x100..=0x14F header carries the title, licensee codes, controller type,
ROM/RAM size codes and two checksums. `from_bytes` validates the layout and
the header checksum (the sum over 0x134..=0x14C), logs (without failing) a
boot-logo mismatch, and instantiates the matching `Mapper`. The global
checksum is recorded but not enforced, as on real hardware.
*/

use std::fmt;

use crate::log::Logger;
use crate::mapper::{Mapper, RomOnly};
use crate::mappers::{Mbc1, Mbc2};

/// Boot-ROM logo bitmap at header offset 0x104; the boot sequence refuses
/// images that do not carry it.
pub const BOOT_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00,
    0x0D, 0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD,
    0xD9, 0x99, 0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB,
    0xB9, 0x33, 0x3E,
];

// Controller type bytes this implementation knows how to drive.
const TYPE_ROM_ONLY: u8 = 0x00;
const TYPE_MBC1: u8 = 0x01;
const TYPE_MBC1_RAM: u8 = 0x02;
const TYPE_MBC1_RAM_BATTERY: u8 = 0x03;
const TYPE_MBC2: u8 = 0x05;
const TYPE_MBC2_BATTERY: u8 = 0x06;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    /// Image ends before the header does.
    TooShort(usize),
    /// Header checksum over 0x134..=0x14C does not match offset 0x14D.
    BadChecksum { stored: u8, computed: u8 },
    /// RAM size code not in the known table.
    UnknownRamSize(u8),
    /// Controller type byte has no implementation here.
    UnsupportedType(u8),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::TooShort(len) => {
                write!(f, "image of {len} bytes ends before the header")
            }
            CartridgeError::BadChecksum { stored, computed } => write!(
                f,
                "header checksum mismatch: stored 0x{stored:02X}, computed 0x{computed:02X}"
            ),
            CartridgeError::UnknownRamSize(code) => {
                write!(f, "unknown RAM size code 0x{code:02X}")
            }
            CartridgeError::UnsupportedType(t) => {
                write!(f, "unsupported cartridge type 0x{t:02X}")
            }
        }
    }
}

impl std::error::Error for CartridgeError {}

/// Parsed header fields (byte offsets relative to the image start).
#[derive(Debug, Clone)]
pub struct Header {
    pub title: String,
    pub cartridge_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub destination_code: u8,
    pub old_licensee_code: u8,
    pub new_licensee_code: [u8; 2],
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl Header {
    fn parse(data: &[u8]) -> Self {
        // Title occupies 0x134..=0x143; the final byte doubles as the color
        // flag, so it is excluded. Stop at the first NUL.
        let title_bytes = &data[0x134..0x143];
        let end = title_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..end]).into_owned();

        Self {
            title,
            cartridge_type: data[0x147],
            rom_size_code: data[0x148],
            ram_size_code: data[0x149],
            destination_code: data[0x14A],
            old_licensee_code: data[0x14B],
            new_licensee_code: [data[0x144], data[0x145]],
            version: data[0x14C],
            header_checksum: data[0x14D],
            global_checksum: u16::from(data[0x14E]) << 8 | u16::from(data[0x14F]),
        }
    }

    /// Declared ROM size in bytes.
    pub fn rom_size(&self) -> usize {
        (32 * 1024) << self.rom_size_code
    }

    /// Declared external RAM size in bytes, if the code is known.
    pub fn ram_size(&self) -> Option<usize> {
        match self.ram_size_code {
            0x00 => Some(0),
            0x02 => Some(0x2000),
            0x03 => Some(0x8000),
            0x04 => Some(0x2_0000),
            0x05 => Some(0x1_0000),
            _ => None,
        }
    }

    /// Human-readable controller name for the type byte.
    pub fn type_name(&self) -> &'static str {
        match self.cartridge_type {
            TYPE_ROM_ONLY => "ROM ONLY",
            TYPE_MBC1 => "MBC1",
            TYPE_MBC1_RAM => "MBC1+RAM",
            TYPE_MBC1_RAM_BATTERY => "MBC1+RAM+BATTERY",
            TYPE_MBC2 => "MBC2",
            TYPE_MBC2_BATTERY => "MBC2+BATTERY",
            0x0F..=0x13 => "MBC3",
            0x19..=0x1E => "MBC5",
            _ => "Unknown",
        }
    }

    /// Publisher name for the common licensee codes; the old code 0x33
    /// defers to the two-character new code.
    pub fn licensee_name(&self) -> &'static str {
        if self.old_licensee_code == 0x33 {
            match &self.new_licensee_code {
                b"00" => "None",
                b"01" => "Nintendo",
                b"08" => "Capcom",
                b"13" => "Electronic Arts",
                b"34" => "Konami",
                b"41" => "Ubi Soft",
                b"51" => "Acclaim",
                b"52" => "Activision",
                b"78" => "THQ",
                _ => "Unknown",
            }
        } else {
            match self.old_licensee_code {
                0x00 => "None",
                0x01 | 0x31 => "Nintendo",
                0x08 | 0x38 => "Capcom",
                0x13 | 0x69 => "Electronic Arts",
                0x34 | 0xA4 => "Konami",
                0x41 => "Ubi Soft",
                0x51 | 0xB0 => "Acclaim",
                0x52 => "Activision",
                0xBB => "Sunsoft",
                _ => "Unknown",
            }
        }
    }
}

/// A loaded cartridge: parsed header plus the live controller.
pub struct Cartridge {
    header: Header,
    mapper: Box<dyn Mapper>,
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl Cartridge {
    /// Parse and validate an image, then build its controller.
    pub fn from_bytes(data: &[u8], log: Logger) -> Result<Self, CartridgeError> {
        if data.len() < 0x150 {
            return Err(CartridgeError::TooShort(data.len()));
        }

        let header = Header::parse(data);

        let computed = header_checksum(data);
        if computed != header.header_checksum {
            return Err(CartridgeError::BadChecksum {
                stored: header.header_checksum,
                computed,
            });
        }

        if data[0x104..0x134] != BOOT_LOGO {
            // Real hardware refuses to boot these; the core only complains.
            log.error(format_args!("boot logo mismatch in cartridge header"));
        }

        let ram_size = header
            .ram_size()
            .ok_or(CartridgeError::UnknownRamSize(header.ram_size_code))?;

        let rom = data.to_vec();
        let mapper: Box<dyn Mapper> = match header.cartridge_type {
            TYPE_ROM_ONLY => Box::new(RomOnly::new(rom, ram_size, log.clone())),
            TYPE_MBC1 | TYPE_MBC1_RAM | TYPE_MBC1_RAM_BATTERY => {
                Box::new(Mbc1::new(rom, ram_size, log.clone()))
            }
            TYPE_MBC2 | TYPE_MBC2_BATTERY => Box::new(Mbc2::new(rom, log.clone())),
            other => return Err(CartridgeError::UnsupportedType(other)),
        };

        log.info(format_args!(
            "loaded cartridge \"{}\" ({}, {} KiB ROM, licensee {})",
            header.title,
            header.type_name(),
            header.rom_size() / 1024,
            header.licensee_name(),
        ));

        Ok(Self { header, mapper })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.mapper.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.mapper.write(addr, value);
    }
}

/// Header checksum: x = x - byte - 1 over 0x134..=0x14C.
fn header_checksum(data: &[u8]) -> u8 {
    let mut checksum = 0u8;
    for &byte in &data[0x134..=0x14C] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::build_rom;

    #[test]
    fn accepts_a_well_formed_image() {
        let rom = build_rom(&[0x00]);
        let cart = Cartridge::from_bytes(&rom, Logger::null()).expect("parse");
        assert_eq!(cart.header().cartridge_type, 0x00);
        assert_eq!(cart.header().rom_size(), 32 * 1024);
        assert_eq!(cart.title(), "TEST");
    }

    #[test]
    fn rejects_a_corrupted_checksum() {
        let mut rom = build_rom(&[0x00]);
        rom[0x134] ^= 0xFF; // clobber a title byte without fixing the checksum
        let err = Cartridge::from_bytes(&rom, Logger::null()).unwrap_err();
        assert!(matches!(err, CartridgeError::BadChecksum { .. }));
    }

    #[test]
    fn rejects_a_truncated_image() {
        let err = Cartridge::from_bytes(&[0u8; 0x100], Logger::null()).unwrap_err();
        assert_eq!(err, CartridgeError::TooShort(0x100));
    }

    #[test]
    fn rejects_unknown_controller_types() {
        let mut rom = build_rom(&[0x00]);
        rom[0x147] = 0xFC; // camera
        fix_checksum(&mut rom);
        let err = Cartridge::from_bytes(&rom, Logger::null()).unwrap_err();
        assert_eq!(err, CartridgeError::UnsupportedType(0xFC));
    }

    #[test]
    fn selects_banked_controllers_from_the_type_byte() {
        let rom = crate::test_utils::build_rom_with(0x01, 0x02, 0x00, &[0x00]);
        let cart = Cartridge::from_bytes(&rom, Logger::null()).expect("parse");
        assert_eq!(cart.header().type_name(), "MBC1");
        assert_eq!(cart.header().rom_size(), 128 * 1024);

        let rom = crate::test_utils::build_rom_with(0x06, 0x02, 0x00, &[0x00]);
        let cart = Cartridge::from_bytes(&rom, Logger::null()).expect("parse");
        assert_eq!(cart.header().type_name(), "MBC2+BATTERY");
    }

    #[test]
    fn reads_reach_the_mapper() {
        let mut rom = build_rom(&[0x00]);
        rom[0x2000] = 0xAB;
        let cart = Cartridge::from_bytes(&rom, Logger::null()).expect("parse");
        assert_eq!(cart.read(0x2000), 0xAB);
    }

    fn fix_checksum(rom: &mut [u8]) {
        rom[0x14D] = header_checksum(rom);
    }
}
