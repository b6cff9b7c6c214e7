/*!
Per-T-cycle orchestration of everything behind the bus.

The machine driver advances the instruction engine first, then calls
`Bus::tick` with the same T-cycle number. Order within a tick: timer (on
machine-cycle boundaries), pixel-pipeline render step, block-transfer step
(machine-cycle boundaries again), audio stub. Interrupts a device raises
during tick N are therefore visible to the instruction engine no earlier
than tick N+1, never the same tick.
*/

use crate::bus::Bus;
use crate::ppu::VideoMem;

impl Bus {
    /// Advance every bus-side component by one T-cycle. `tcycle` is the
    /// global T-cycle counter; machine-cycle work runs on its final phase.
    pub fn tick(&mut self, tcycle: u64) {
        let machine_boundary = tcycle % 4 == 3;

        if machine_boundary {
            self.timer.on_machine_cycle(&mut self.intr);
        }

        self.ppu_tick();

        if machine_boundary {
            self.dma_machine_cycle();
        }

        self.apu.tick();
    }

    /// One render step, with a read-only view of the bus-owned video
    /// memories for the pipeline's internal fetches.
    pub(crate) fn ppu_tick(&mut self) {
        let mem = VideoMem {
            vram: &self.vram,
            oam: &self.oam,
        };
        self.ppu.tick(&mem, &mut self.intr);
    }
}
