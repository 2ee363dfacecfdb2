//! 实验数据与参数加载. 真实数据路径与实验参数均可由环境变量覆盖.

use std::env;
use std::path::PathBuf;

use dti_berry::acquisition::Acquisition;
use dti_berry::io::{self, DwiScan, IoError};

/// 默认合成体模边长.
pub const DEFAULT_PHANTOM_SIDE: usize = 32;

/// 默认参与比较的批次大小.
pub const DEFAULT_BATCH_SIZES: [usize; 4] = [64, 256, 1024, 4096];

/// 获取 DWI 数据目录.
///
/// 1. 若环境变量 `$DTI_DWI_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/dwi`. 无法确定家目录时返回 `None`.
pub fn dwi_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("DTI_DWI_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => {
            let mut ans = dirs::home_dir()?;
            ans.extend(["dataset", "dwi"]);
            Some(ans)
        }
    }
}

/// 从 `dir` 读取 `dwi.nii.gz`, `dwi.bval` 与 `dwi.bvec`.
pub fn dwi_case(dir: PathBuf) -> Result<(DwiScan, Acquisition), IoError> {
    let scan = DwiScan::open(dir.join("dwi.nii.gz"))?;
    let acq = io::read_acquisition(dir.join("dwi.bval"), dir.join("dwi.bvec"))?;
    Ok((scan, acq))
}

/// 若 DWI 数据目录存在, 则加载其中的数据.
///
/// 目录不存在时返回 `None`; 目录存在但读取失败时返回 `Some(Err)`.
pub fn dwi_case_from_env_or_home() -> Option<Result<(DwiScan, Acquisition), IoError>> {
    let dir = dwi_dir_from_env_or_home()?;
    dir.is_dir().then(|| dwi_case(dir))
}

/// 合成体模边长. 读取 `$DTI_PHANTOM_SIDE`, 缺省或非法时为 [`DEFAULT_PHANTOM_SIDE`].
pub fn phantom_side_from_env() -> usize {
    env::var("DTI_PHANTOM_SIDE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PHANTOM_SIDE)
}

/// 参与比较的批次大小. 读取逗号分隔的 `$DTI_BATCH_SIZES`,
/// 缺省或没有任何合法值时为 [`DEFAULT_BATCH_SIZES`].
pub fn batch_sizes_from_env() -> Vec<usize> {
    let parsed: Vec<usize> = env::var("DTI_BATCH_SIZES")
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse().ok())
                .filter(|n| *n > 0)
                .collect()
        })
        .unwrap_or_default();
    if parsed.is_empty() {
        DEFAULT_BATCH_SIZES.to_vec()
    } else {
        parsed
    }
}
