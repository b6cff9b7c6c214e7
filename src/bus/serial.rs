/*!
Serial port registers: SB (0xFF01, data) and SC (0xFF02, control).

Free-standing latches only. There is no link-cable peer, so no transfer is
ever performed and no serial interrupt is ever raised from here; software
that polls SC simply sees its own control byte with the unused bits high.
*/

#[derive(Debug, Default)]
pub struct Serial {
    data: u8,
    control: u8,
}

impl Serial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.data,
            _ => self.control | 0x7E,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0xFF01 => self.data = value,
            _ => self.control = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_hold_written_values() {
        let mut serial = Serial::new();
        serial.write(0xFF01, 0x5A);
        assert_eq!(serial.read(0xFF01), 0x5A);

        serial.write(0xFF02, 0x81);
        // Unused control bits read back as 1.
        assert_eq!(serial.read(0xFF02), 0x81 | 0x7E);
    }
}
