//! Codeblock storage: index accounting, backing arena and bit views

pub mod arena;
pub mod bits;
pub mod store;

pub use arena::SoftBitArena;
pub use bits::BitBuffer;
pub use store::{CodeblockId, CodeblockStore};
