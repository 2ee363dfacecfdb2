use ndarray::{Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView4, Axis};

use super::Mask;
use crate::{Idx3d, Idx3dU16};

/// `lookup` 中代表 "未参与拟合" 的值.
const UNMASKED: u32 = u32::MAX;

/// &Idx3d -> Idx3dU16
#[inline]
const fn idx3d_to_u16((x, y, z): &Idx3d) -> Idx3dU16 {
    // Usize to uShort
    (*x as u16, *y as u16, *z as u16)
}

/// &Idx3dU16 -> Idx3d
#[inline]
const fn idx3du16_to_usize((x, y, z): &Idx3dU16) -> Idx3d {
    // uShort to Usize
    (*x as usize, *y as usize, *z as usize)
}

/// 紧凑体素列表与三维坐标之间的双向映射.
///
/// 参与拟合的体素按行优先序排成紧凑列表, 第 `i` 个体素的坐标保存在 `coords[i]`;
/// 反方向由与体数据同形状的 `lookup` 给出.
#[derive(Debug, Clone)]
pub struct VoxelIndex {
    coords: Vec<Idx3dU16>,
    lookup: Array3<u32>,
}

impl VoxelIndex {
    /// 由 mask 构建映射.
    ///
    /// 任一维度超过 `u16::MAX + 1`, 或参与拟合的体素过多时 panic.
    pub fn from_mask(mask: &Mask) -> Self {
        let (x, y, z) = mask.shape();
        let limit = u16::MAX as usize + 1;
        assert!(x <= limit && y <= limit && z <= limit, "体数据单维度过大");

        let mut coords = Vec::with_capacity(mask.count());
        let mut lookup = Array3::from_elem(mask.shape(), UNMASKED);
        for (pos, _) in mask.data().indexed_iter().filter(|(_, m)| **m) {
            assert!(coords.len() < UNMASKED as usize, "参与拟合的体素过多");
            lookup[pos] = coords.len() as u32;
            coords.push(idx3d_to_u16(&pos));
        }
        coords.shrink_to_fit();
        Self { coords, lookup }
    }

    /// 参与拟合的体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// 是否没有任何体素参与拟合.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// 空间形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.lookup.dim()
    }

    /// 紧凑列表中第 `i` 个体素的坐标. 越界时 panic.
    #[inline]
    pub fn coord(&self, i: usize) -> Idx3d {
        idx3du16_to_usize(&self.coords[i])
    }

    /// 坐标 `pos` 在紧凑列表中的下标. 未参与拟合或越界时返回 `None`.
    #[inline]
    pub fn index_of(&self, pos: Idx3d) -> Option<usize> {
        self.lookup
            .get(pos)
            .filter(|i| **i != UNMASKED)
            .map(|i| *i as usize)
    }

    /// 按紧凑列表顺序迭代坐标.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Idx3d> + '_ {
        self.coords.iter().map(idx3du16_to_usize)
    }

    /// 从 `(X, Y, Z, g)` 的信号中取出参与拟合的体素, 得到 `V x g` 的紧凑信号.
    ///
    /// 信号前三维与映射形状不一致时 panic.
    pub fn gather(&self, signal: ArrayView4<f32>) -> Array2<f32> {
        let (x, y, z, g) = signal.dim();
        assert_eq!((x, y, z), self.shape(), "信号与体素索引形状不一致");

        let mut ans = Array2::<f32>::zeros((self.len(), g));
        for (mut row, (x, y, z)) in ans.axis_iter_mut(Axis(0)).zip(self.iter()) {
            row.assign(&signal.slice(ndarray::s![x, y, z, ..]));
        }
        ans
    }

    /// 把 `V x C` 的紧凑结果放回 `(X, Y, Z, C)` 的体数据. 未参与拟合的体素填 0.
    ///
    /// `compact` 行数与体素个数不一致时 panic.
    pub fn scatter(&self, compact: ArrayView2<f64>) -> Array4<f32> {
        assert_eq!(compact.nrows(), self.len());
        let (x, y, z) = self.shape();
        let mut ans = Array4::<f32>::zeros((x, y, z, compact.ncols()));
        for (row, (x, y, z)) in compact.axis_iter(Axis(0)).zip(self.iter()) {
            ans.slice_mut(ndarray::s![x, y, z, ..])
                .iter_mut()
                .zip(row.iter())
                .for_each(|(dst, src)| *dst = *src as f32);
        }
        ans
    }

    /// 把长度为 `V` 的紧凑标量放回 `(X, Y, Z)` 的体数据. 未参与拟合的体素填 0.
    pub fn scatter_scalar(&self, compact: ArrayView1<f64>) -> Array3<f32> {
        assert_eq!(compact.len(), self.len());
        let mut ans = Array3::<f32>::zeros(self.shape());
        for (v, pos) in compact.iter().zip(self.iter()) {
            ans[pos] = *v as f32;
        }
        ans
    }
}
