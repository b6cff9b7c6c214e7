/*!
Banked cartridge controllers.

Each module implements `crate::mapper::Mapper` for one controller family.
Selection from the header type byte happens in `crate::cartridge`.
*/

pub mod mbc1;
pub mod mbc2;

pub use mbc1::Mbc1;
pub use mbc2::Mbc2;
