use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array4, ArrayView3, ArrayView4, Axis, Ix3, Ix4};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use super::IoError;
use crate::{Mask, TensorVolume};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// [`save_scalar_maps`] 输出的各 3D 标量图后缀, 按输出顺序排列.
///
/// `ev1p`, `ev1f`, `ev1s` 依次是主方向的三个分量, `t2di` 是 b0 通道.
pub const SCALAR_MAP_NAMES: [&str; 9] = [
    "ev1", "ev2", "ev3", "adc", "fa", "ev1p", "ev1f", "ev1s", "t2di",
];

/// [`save_scalar_maps`] 输出的 4D 张量分量图后缀, 分量顺序为 `Dxx, Dyy, Dzz, Dxy, Dxz, Dyz`.
pub const TENSOR_MAP_NAME: &str = "self_diffusion";

/// nii 格式 4D DWI 扫描, 包括 header 和 `(X, Y, Z, g)` 的信号. 信号以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct DwiScan {
    header: BoxedHeader,
    data: Array4<f32>,
}

impl DwiScan {
    /// 打开 nii 文件格式的 4D DWI 扫描. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()?
            .into_dimensionality::<Ix4>()?;
        info!("opened DWI scan {:?}: {:?}", path.as_ref(), data.dim());
        Ok(Self { header, data })
    }

    /// 由已有的 header 与信号构建.
    pub fn from_parts(header: NiftiHeader, data: Array4<f32>) -> Self {
        Self {
            header: Box::new(header),
            data,
        }
    }

    /// 获取 header 部分.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// `(X, Y, Z, g)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    /// 第一个通道.
    #[inline]
    pub fn b0(&self) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(3), 0)
    }
}

/// 读取 3D nii 格式的 mask, 非零体素参与拟合.
pub fn read_mask<P: AsRef<Path>>(path: P) -> Result<Mask, IoError> {
    let data = ReaderOptions::new()
        .read_file(path.as_ref())?
        .into_volume()
        .into_ndarray::<f32>()?
        .into_dimensionality::<Ix3>()?;
    Ok(Mask::from_volume(&data))
}

/// `{root}_{name}.nii.gz`.
fn map_path(root: &Path, name: &str) -> PathBuf {
    let mut s = OsString::from(root.as_os_str());
    s.push(format!("_{name}.nii.gz"));
    PathBuf::from(s)
}

/// 以 `header` 为参考, 把特征值, ADC, FA, 主方向以及 `b0` 写成一组 3D `.nii.gz` 文件,
/// 文件名为 `{out_root}_{name}.nii.gz`, `name` 见 [`SCALAR_MAP_NAMES`].
/// 张量的六个分量另外写成一个 4D 文件 `{out_root}_self_diffusion.nii.gz`.
///
/// 返回输出路径, 先按 [`SCALAR_MAP_NAMES`] 顺序, 最后是张量分量图.
///
/// # 注意
///
/// `b0` 与拟合结果的空间形状不一致时 panic.
pub fn save_scalar_maps(
    vol: &TensorVolume,
    b0: ArrayView3<f32>,
    header: &NiftiHeader,
    out_root: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, IoError> {
    assert_eq!(b0.dim(), vol.shape(), "b0 与拟合结果形状不一致");
    let e1 = vol.principal_evec();
    let maps: [ArrayView3<f32>; 9] = [
        vol.eval(0),
        vol.eval(1),
        vol.eval(2),
        vol.adc(),
        vol.fa(),
        e1.index_axis(Axis(3), 0),
        e1.index_axis(Axis(3), 1),
        e1.index_axis(Axis(3), 2),
        b0.view(),
    ];

    let mut written = Vec::with_capacity(maps.len() + 1);
    for (name, map) in SCALAR_MAP_NAMES.iter().zip(maps.iter()) {
        let path = map_path(out_root.as_ref(), name);
        info!("saving {name} map ... {}", path.display());
        WriterOptions::new(&path)
            .reference_header(header)
            .write_nifti(map)?;
        written.push(path);
    }

    let path = map_path(out_root.as_ref(), TENSOR_MAP_NAME);
    info!("saving {TENSOR_MAP_NAME} map ... {}", path.display());
    WriterOptions::new(&path)
        .reference_header(header)
        .write_nifti(&vol.tensor())?;
    written.push(path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{Acquisition, GradientTable};
    use crate::FitOptions;
    use ndarray::{array, s, Array3};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dti-berry-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_map_path() {
        let p = map_path(Path::new("/tmp/out/subj01"), "fa");
        assert_eq!(p, PathBuf::from("/tmp/out/subj01_fa.nii.gz"));
    }

    #[test]
    fn test_dwi_round_trip() {
        let dir = scratch("dwi");
        let path = dir.join("dwi.nii.gz");
        let data = Array4::<f32>::from_shape_fn((3, 2, 2, 4), |(x, y, z, c)| {
            (x * 1000 + y * 100 + z * 10 + c) as f32
        });
        WriterOptions::new(&path).write_nifti(&data).unwrap();

        let scan = DwiScan::open(&path).unwrap();
        assert_eq!(scan.shape(), (3, 2, 2, 4));
        assert_eq!(scan.data(), data.view());
        assert_eq!(scan.b0()[(2, 1, 0)], 2100.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_mask() {
        let dir = scratch("mask");
        let path = dir.join("mask.nii");
        let mut m = Array3::<u8>::zeros((2, 3, 4));
        m[(1, 2, 3)] = 1;
        m[(0, 0, 0)] = 7;
        WriterOptions::new(&path).write_nifti(&m).unwrap();

        let mask = read_mask(&path).unwrap();
        assert_eq!(mask.shape(), (2, 3, 4));
        assert_eq!(mask.count(), 2);
        assert!(mask[(1, 2, 3)]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_scalar_maps() {
        let g = GradientTable::from_directions([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.6, 0.8, 0.0],
            [0.6, 0.0, 0.8],
            [0.0, 0.6, 0.8],
        ]);
        let bvals = array![0.0, 1000.0, 1000.0, 1000.0, 1000.0, 1000.0, 1000.0];
        let acq = Acquisition::new(g.clone(), bvals.clone());
        // 沿 x 方向扩散更快, 左下角体素在 mask 之外.
        let data = Array4::from_shape_fn((3, 2, 2, 7), |(x, y, z, c)| {
            let s0 = if x + y + z == 0 { 0.0 } else { 400.0 + 100.0 * x as f64 };
            let [gx, gy, gz] = g.direction(c);
            let d = 1.5e-3 * gx * gx + 0.5e-3 * gy * gy + 0.3e-3 * gz * gz;
            (s0 * (-bvals[c] * d).exp()) as f32
        });
        let scan = DwiScan::from_parts(NiftiHeader::default(), data);
        let vol = TensorVolume::fit(scan.data(), &acq, None, &FitOptions::default()).unwrap();

        let dir = scratch("maps");
        let root = dir.join("subj");
        let written = save_scalar_maps(&vol, scan.b0(), scan.header(), &root).unwrap();
        assert_eq!(written.len(), 10);
        assert_eq!(written[4], dir.join("subj_fa.nii.gz"));
        assert_eq!(written[8], dir.join("subj_t2di.nii.gz"));
        assert_eq!(written[9], dir.join("subj_self_diffusion.nii.gz"));
        assert!(written.iter().all(|p| p.exists()));

        let read3 = |p: &Path| {
            ReaderOptions::new()
                .read_file(p)
                .unwrap()
                .into_volume()
                .into_ndarray::<f32>()
                .unwrap()
                .into_dimensionality::<Ix3>()
                .unwrap()
        };
        let fa = read3(&written[4]);
        assert_eq!(fa.dim(), (3, 2, 2));
        assert_eq!(fa, vol.fa());
        assert!(fa[(2, 1, 1)] > 0.3);
        let ev1p = read3(&written[5]);
        assert_eq!(ev1p, vol.principal_evec().slice(s![.., .., .., 0]));
        assert_eq!(read3(&written[8]), scan.b0());

        let tensor = ReaderOptions::new()
            .read_file(&written[9])
            .unwrap()
            .into_volume()
            .into_ndarray::<f32>()
            .unwrap()
            .into_dimensionality::<Ix4>()
            .unwrap();
        assert_eq!(tensor.dim(), (3, 2, 2, 6));
        assert_eq!(tensor, vol.tensor());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
