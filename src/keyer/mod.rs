//! Key input subsystems (spec §4.6, §4.7): a generator accepts at most one
//! of these attached at a time, since both ultimately drive the same tone
//! queue.

mod iambic;
mod straight;

pub use iambic::IambicKeyer;
pub use straight::StraightKey;
