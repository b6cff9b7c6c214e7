/*!
Scanline mode machine and pixel output.

Per scanline: object-search (80 ticks) -> pixel-transfer (variable, driven
by the fetchers and window activation) -> horizontal-blank (pads to 456
ticks), for 144 lines, then 10 scanlines of vertical blank. LY increments
at tick 454, not at the line boundary, and the LY==LYC compare is gated off
for exactly that tick. The final vertical-blank line resets LY to 0 at tick
2 and then runs out with LY already 0.

The STAT interrupt line is the OR of the enabled condition bits; a request
is issued only on its rising edge; software relies on the level staying
high without refiring.
*/

use crate::bus::interrupts::{Interrupt, InterruptLine};
use crate::ppu::{BgPixel, Mode, Ppu, VideoMem};

impl Ppu {
    /// Advance one T-cycle of the pipeline. A disabled display holds state.
    pub(crate) fn tick(&mut self, mem: &VideoMem, intr: &mut InterruptLine) {
        if self.lcdc & 0x80 == 0 {
            return;
        }

        match self.mode {
            Mode::OamSearch => self.oam_search(mem),
            Mode::PixelTransfer => self.pixel_transfer(mem),
            Mode::HBlank => self.hblank(intr),
            Mode::VBlank => self.vblank(),
        }

        // STAT condition lines, sampled after the mode step.
        let lyc_eq = self.lyc == self.ly && self.coincidence_gate;
        let lyc_irq = self.stat & 0x40 != 0 && lyc_eq;
        let hblank_irq = self.stat & 0x08 != 0 && self.mode == Mode::HBlank;
        let vblank_irq =
            (self.stat & 0x10 != 0 || self.stat & 0x20 != 0) && self.mode == Mode::VBlank;
        let oam_irq = self.stat & 0x20 != 0 && self.mode == Mode::OamSearch;

        if lyc_eq {
            self.stat |= 0x04;
        } else {
            self.stat &= !0x04;
        }

        // Rising edge only: the request must not refire while the OR of the
        // enabled conditions stays high.
        let line = lyc_irq || hblank_irq || vblank_irq || oam_irq;
        if line && !self.stat_irq_line {
            intr.request(Interrupt::LcdStat);
        }
        self.stat_irq_line = line;

        // The WY match is checked every tick and latches for the frame.
        if self.ly == self.wy && self.lcdc & 0x20 != 0 {
            self.wy_latch = true;
        }
    }

    pub(in crate::ppu) fn pixel_transfer(&mut self, mem: &VideoMem) {
        if self.line_ticks == 80 {
            // Prime the FIFO with 8 discard pixels, then drop SCX % 8 of
            // them to realize the sub-tile horizontal scroll.
            self.pixel_transfer_reset();
            for _ in 0..8 {
                self.bg_fifo.push_back(BgPixel::default());
            }
            for _ in 0..(self.scx % 8) {
                self.bg_fifo.pop_front();
            }
            self.line_ticks += 1;
            return;
        } else if self.line_ticks < 83 {
            self.line_ticks += 1;
            return;
        }

        let mut pushed_pixel = false;
        if self.can_push_pixel() {
            if let Some(bg) = self.bg_fifo.pop_front() {
                let mut palette = self.bgp;
                let mut color = bg.color;
                let mut from_background = true;

                if let Some(obj) = self.obj_fifo.pop_front() {
                    let objects_on = self.lcdc & 0x02 != 0;
                    let opaque = obj.color != 0;
                    let wins = !obj.bg_priority || bg.color == 0;
                    if objects_on && opaque && wins {
                        palette = if obj.palette1 { self.obp1 } else { self.obp0 };
                        color = obj.color;
                        from_background = false;
                    }
                }

                let mut shade = (palette >> (color * 2)) & 0x03;
                if self.lx >= 8 {
                    if from_background && self.lcdc & 0x01 == 0 {
                        shade = 0;
                    }
                    let x = usize::from(self.lx - 8);
                    let y = usize::from(self.ly);
                    self.put_pixel(x, y, shade);
                }
                pushed_pixel = true;
                self.check_window();
            }
        }

        self.fetcher_tick(mem);

        self.line_ticks += 1;
        if pushed_pixel {
            self.lx += 1;
            if self.lx >= 168 {
                self.set_mode(Mode::HBlank);
            }
        }
    }

    /// A background pixel can leave the FIFO this tick.
    fn can_push_pixel(&self) -> bool {
        !self.bg_fifo.is_empty()
            && !self.fetching_object
            && (!self.has_object_at(self.lx) || self.lcdc & 0x02 == 0)
    }

    /// Per-scanline window-column trigger.
    fn check_window(&mut self) {
        if self.wy_latch && !self.wx_active && self.lx == self.wx && self.lcdc & 0x20 != 0 {
            self.wx_active = true;
            self.window_just_activated = true;
            self.window_line = self.window_line.wrapping_add(1);
            self.window_tile = 0;
            self.bg_fifo.clear();
            self.fetch = super::FetchStep::GetTile;
            self.fetch_next = super::FetchStep::Delay;
        }
    }

    pub(in crate::ppu) fn hblank(&mut self, intr: &mut InterruptLine) {
        if self.synthetic_oam_scan {
            // After LCD re-enable the first pass idles here for an
            // object-search-length stretch, scanning nothing, then drops
            // straight into pixel transfer.
            self.line_ticks += 1;
            if self.line_ticks >= 80 {
                self.synthetic_oam_scan = false;
                self.set_mode(Mode::PixelTransfer);
            }
            return;
        }

        self.line_ticks += 1;
        self.coincidence_gate = self.line_ticks != 454;
        if self.line_ticks == 454 {
            self.ly += 1;
        }
        if self.line_ticks >= super::TICKS_PER_LINE {
            if self.ly >= 144 {
                self.set_mode(Mode::VBlank);
                intr.request(Interrupt::VBlank);
            } else {
                self.set_mode(Mode::OamSearch);
            }
            self.line_ticks = 0;
            self.line_objects.clear();
        }
    }

    pub(in crate::ppu) fn vblank(&mut self) {
        if self.last_vblank_line {
            // Line 153: LY snaps back to 0 at tick 2 and the line runs out
            // with LY already 0 before object search resumes.
            self.line_ticks += 1;
            self.coincidence_gate = self.line_ticks != 2;
            if self.line_ticks == 2 {
                self.ly = 0;
            }
            if self.line_ticks >= super::TICKS_PER_LINE {
                if self.ly == 0 {
                    self.window_line = 0xFF;
                    self.wy_latch = false;
                    self.set_mode(Mode::OamSearch);
                    self.line_objects.clear();
                    self.last_vblank_line = false;
                }
                self.line_ticks = 0;
            }
        } else {
            self.line_ticks += 1;
            self.coincidence_gate = self.line_ticks != 454;
            if self.line_ticks == 454 {
                self.ly += 1;
            }
            if self.line_ticks >= super::TICKS_PER_LINE {
                if self.ly == 153 {
                    self.last_vblank_line = true;
                }
                self.line_ticks = 0;
            }
        }
    }
}
