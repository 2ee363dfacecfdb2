use std::fs::File;
use std::path::Path;

use ndarray_npy::NpzWriter;

use super::IoError;
use crate::TensorVolume;

/// 把拟合结果写入一个 npz 归档.
///
/// 归档中包含 `evals (X, Y, Z, 3)`, `evecs (X, Y, Z, 9)`, `adc`, `fa`, `s0`
/// (均为 `f32`) 以及 `mask` (`u8`, 参与拟合为 1).
pub fn save_npz<P: AsRef<Path>>(vol: &TensorVolume, path: P) -> Result<(), IoError> {
    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("evals", &vol.evals())?;
    npz.add_array("evecs", &vol.evecs())?;
    npz.add_array("adc", &vol.adc())?;
    npz.add_array("fa", &vol.fa())?;
    npz.add_array("s0", &vol.s0())?;
    npz.add_array("mask", &vol.mask().data().mapv(u8::from))?;
    npz.finish()?;
    Ok(())
}
