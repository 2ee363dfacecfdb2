//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::acquisition::{Acquisition, GradientTable};
pub use crate::data::{Mask, VoxelIndex};
pub use crate::{Diagnostic, FitError, FitResult};

pub use crate::fit::{fit_voxels, FitOptions, WlsFit};
pub use crate::progress::{CancelToken, FitControl, LogProgress, ProgressEvent, ProgressObserver};
pub use crate::tensor::{decompose, DiffusionTensor, EigenResult};
pub use crate::TensorVolume;

pub use crate::consts::{DEFAULT_B0_THRESHOLD, DEFAULT_BATCH_SIZE};

pub use crate::io::{read_acquisition, read_mask, save_npz, save_scalar_maps, DwiScan};
