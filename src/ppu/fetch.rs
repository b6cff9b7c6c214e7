/*!
Background/window fetcher: the 5-step delay/get-tile/get-low/get-high/push
machine that keeps the background FIFO fed during pixel transfer.

Each data step costs two ticks (one delay, one fetch). A push into an empty
FIFO loads eight pixels from the latched bitplanes. Window activation
restarts the fetcher against the window tile map; the first window push
bypasses object pre-emption for that tile. Object fetches pre-empt this
machine entirely; see `sprite.rs`.
*/

use crate::ppu::{BgPixel, FetchStep, Ppu, VideoMem};

impl Ppu {
    pub(in crate::ppu) fn fetcher_tick(&mut self, mem: &VideoMem) {
        if self.fetching_object {
            self.object_fetcher_tick(mem);
            return;
        }
        match self.fetch {
            FetchStep::Delay => {
                if self.fetch_next == FetchStep::Push {
                    self.bgx = self.bgx.wrapping_add(8);
                    if self.window_just_activated {
                        // The first window tile pushes straight through.
                        self.window_just_activated = false;
                        self.push_tile_row();
                        self.fetch = FetchStep::GetTile;
                        return;
                    }
                    if self.can_fetch_object() && !self.bg_fifo.is_empty() {
                        self.begin_object_fetch();
                    }
                }
                self.fetch = self.fetch_next;
            }
            FetchStep::GetTile => {
                // The window can be switched off mid-line.
                if self.wx_active && self.lcdc & 0x20 == 0 {
                    self.wx_active = false;
                }
                let (map_base, tilemap_x, tilemap_y);
                if self.wx_active {
                    tilemap_x = u16::from(self.window_tile);
                    self.window_tile = self.window_tile.wrapping_add(1);
                    tilemap_y = u16::from(self.window_line / 8);
                    map_base = if self.lcdc & 0x40 != 0 { 0x9C00 } else { 0x9800 };
                    if self.window_just_activated {
                        // The activation push must not advance the column.
                        self.bgx = self.bgx.wrapping_sub(8);
                    }
                } else {
                    tilemap_x = ((u16::from(self.bgx) + u16::from(self.scx)) / 8) % 32;
                    tilemap_y = ((u16::from(self.ly) + u16::from(self.scy)) / 8) % 32;
                    map_base = if self.lcdc & 0x08 != 0 { 0x9C00 } else { 0x9800 };
                }
                self.tile_number = mem.vram_at(map_base + 32 * tilemap_y + tilemap_x);
                self.fetch = FetchStep::Delay;
                self.fetch_next = FetchStep::GetDataLow;
            }
            FetchStep::GetDataLow | FetchStep::GetDataHigh => {
                // Unsigned addressing from 0x8000, or signed from 0x9000.
                let base = if self.lcdc & 0x10 != 0 {
                    0x8000 + 16 * u16::from(self.tile_number)
                } else {
                    (0x9000i32 + 16 * i32::from(self.tile_number as i8)) as u16
                };
                let tile_y = if self.wx_active {
                    u16::from(self.window_line % 8)
                } else {
                    (u16::from(self.ly) + u16::from(self.scy)) % 8
                };
                let addr = base + 2 * tile_y;
                if self.fetch == FetchStep::GetDataLow {
                    self.tile_low = mem.vram_at(addr);
                    self.fetch_next = FetchStep::GetDataHigh;
                } else {
                    self.tile_high = mem.vram_at(addr + 1);
                    self.fetch_next = FetchStep::Push;
                }
                self.fetch = FetchStep::Delay;
            }
            FetchStep::Push => {
                if self.bg_fifo.is_empty() {
                    self.push_tile_row();
                    self.fetch = FetchStep::GetTile;
                    if self.wx_active {
                        return;
                    }
                }
                if self.can_fetch_object() {
                    self.begin_object_fetch();
                }
            }
        }
    }

    /// Load eight pixels from the latched bitplanes into the FIFO.
    fn push_tile_row(&mut self) {
        for i in 0..8 {
            let high = ((self.tile_high >> (7 - i)) & 1) << 1;
            let low = (self.tile_low >> (7 - i)) & 1;
            self.bg_fifo.push_back(BgPixel { color: high | low });
        }
    }
}
