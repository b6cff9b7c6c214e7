use dotmatrix::bus::Access;
use dotmatrix::cartridge::BOOT_LOGO;
use dotmatrix::cpu::Reg16;
use dotmatrix::log::Logger;
use dotmatrix::{Cartridge, Machine};

fn build_demo_rom() -> Vec<u8> {
    // 32 KiB unbanked image: valid logo + header checksum, entry jumps to
    // a small program at 0x150.
    let mut rom = vec![0u8; 32 * 1024];
    rom[0x100] = 0x00; // NOP
    rom[0x101] = 0xC3; // JP 0x0150
    rom[0x102] = 0x50;
    rom[0x103] = 0x01;
    rom[0x104..0x134].copy_from_slice(&BOOT_LOGO);
    rom[0x134..0x138].copy_from_slice(b"DEMO");

    let program: &[u8] = &[
        0x3E, 0x10, // LD A,0x10
        0xC6, 0x05, // ADD A,0x05 => A = 0x15
        0xEA, 0x00, 0xC0, // LD (0xC000),A
        0x04, // INC B
        0x20, 0xFD, // JR NZ,-3 -> loop until B wraps to 0
        0x76, // HALT
    ];
    rom[0x150..0x150 + program.len()].copy_from_slice(program);

    let mut checksum = 0u8;
    for &byte in &rom[0x134..=0x14C] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    rom[0x14D] = checksum;
    rom
}

fn main() {
    // With the display front-end built in, a ROM path argument runs
    // interactively; otherwise fall through to the headless demo.
    #[cfg(feature = "display")]
    if let Some(path) = std::env::args().nth(1) {
        let data = std::fs::read(&path).expect("failed to read ROM image");
        let cart = Cartridge::from_bytes(&data, Logger::default()).expect("failed to parse image");
        let machine = Machine::new(cart);
        dotmatrix::display::run(machine).expect("front-end failed");
        return;
    }

    // Build the in-memory demo cartridge and run a few frames.
    let rom = build_demo_rom();
    let cart = Cartridge::from_bytes(&rom, Logger::default()).expect("failed to parse demo ROM");
    let mut machine = Machine::new(cart);

    for _ in 0..4 {
        machine.step_frame();
    }

    // Inspect state
    let m_c000 = machine.bus.read(0xC000, Access::Cpu);
    println!("AF: 0x{:04X}", machine.cpu.regs.r16(Reg16::AF));
    println!("BC: 0x{:04X}", machine.cpu.regs.r16(Reg16::BC));
    println!("DE: 0x{:04X}", machine.cpu.regs.r16(Reg16::DE));
    println!("HL: 0x{:04X}", machine.cpu.regs.r16(Reg16::HL));
    println!("SP: 0x{:04X}", machine.cpu.regs.sp);
    println!("PC: 0x{:04X}", machine.cpu.regs.pc);
    println!("halted: {}", machine.cpu.is_halted());
    println!("mem[0xC000]: 0x{m_c000:02X}");
    println!("T-cycles: {}", machine.tcycles());
}
