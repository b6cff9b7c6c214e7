#![doc = r#"
Dotmatrix library crate.

Cycle-accurate core for the 8-bit dot-matrix handheld: a shared-clock
simulation of the instruction engine, bus arbiter, pixel pipeline, timer,
interrupt controller and block-transfer unit, plus the cartridge-side
collaborators around them.

Modules:
- apu: audio register stub (no synthesis)
- bus: bus arbiter, clock orchestration, DMA, interrupts, serial pair
- cartridge: ROM image loader, header parse/validation, mapper selection
- cpu: instruction engine (registers + decode + micro-step execution)
- joypad: input register and front-end button events
- log: injected log-sink interface used by all components
- machine: top-level driver owning the CPU and the bus
- mapper: mapper trait and the unbanked implementation
- mappers: banked cartridge controllers (MBC1, MBC2)
- ppu: pixel pipeline (object search, fetchers, FIFOs, mode machine)
- timer: divider and programmable counter

In tests, shared ROM-image builders are available under `crate::test_utils`.
"#]

// Core emulator modules
pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod joypad;
pub mod log;
pub mod machine;
pub mod mapper;
pub mod mappers;
pub mod ppu;
pub mod timer;

#[cfg(feature = "display")]
pub mod display;
#[cfg(feature = "screenshot")]
pub mod screenshot;

// Re-export commonly used types at the crate root for convenience.
pub use bus::Bus;
pub use cartridge::Cartridge;
pub use cpu::Cpu;
pub use joypad::Button;
pub use machine::Machine;

// Shared test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;
