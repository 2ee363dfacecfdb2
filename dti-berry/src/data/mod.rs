//! 体素 mask 与紧凑体素列表.

mod index;
mod mask;

pub use index::VoxelIndex;
pub use mask::Mask;
