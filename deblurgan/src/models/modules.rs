mod conv_unit;
mod fpn_head;
mod utils;

pub use conv_unit::*;
pub use fpn_head::*;
pub use utils::*;
