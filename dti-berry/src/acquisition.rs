//! 采集参数: 梯度表与 b 值.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{FitError, FitResult};

/// 扩散梯度表. 内部统一按 `3 x g` 存储, 第 `i` 列是第 `i` 次采集的梯度方向.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTable {
    data: Array2<f64>,
}

impl GradientTable {
    /// 从 `3 x g` 或 `g x 3` 的数组构建梯度表.
    ///
    /// 当两维都是 3 时按 `3 x g` 处理. 其余形状返回 `Err`.
    pub fn new(data: Array2<f64>) -> FitResult<Self> {
        match data.dim() {
            (3, _) => Ok(Self { data }),
            (_, 3) => Ok(Self {
                data: data.reversed_axes().as_standard_layout().into_owned(),
            }),
            shape => Err(FitError::GradientShape(shape)),
        }
    }

    /// 从方向列表构建梯度表.
    pub fn from_directions<I: IntoIterator<Item = [f64; 3]>>(it: I) -> Self {
        let dirs: Vec<[f64; 3]> = it.into_iter().collect();
        let data = Array2::from_shape_fn((3, dirs.len()), |(axis, i)| dirs[i][axis]);
        Self { data }
    }

    /// 梯度方向个数 (列数).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 第 `i` 个梯度方向.
    ///
    /// 当 `i` 越界时 panic.
    #[inline]
    pub fn direction(&self, i: usize) -> [f64; 3] {
        let c = self.data.column(i);
        [c[0], c[1], c[2]]
    }

    /// `3 x g` 视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}

/// 一次 DWI 扫描的采集参数.
///
/// 该结构不强制梯度表列数与 b 值个数相等: 两者不一致的情况由
/// [`crate::design::design_matrix`] 负责恢复并给出诊断.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    gradients: GradientTable,
    bvals: Array1<f64>,
}

impl Acquisition {
    /// 构建采集参数. b 值必须非负且有限, 否则程序 panic.
    pub fn new(gradients: GradientTable, bvals: Array1<f64>) -> Self {
        assert!(
            bvals.iter().all(|b| b.is_finite() && *b >= 0.0),
            "b 值必须为非负有限数"
        );
        Self { gradients, bvals }
    }

    /// 梯度表.
    #[inline]
    pub fn gradients(&self) -> &GradientTable {
        &self.gradients
    }

    /// b 值.
    #[inline]
    pub fn bvals(&self) -> ArrayView1<'_, f64> {
        self.bvals.view()
    }

    /// 采集次数, 即 b 值个数 `g`.
    #[inline]
    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    /// 是否没有任何采集.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }

    /// 第一个 b0 (b = 0) 采集的下标.
    pub fn first_b0(&self) -> Option<usize> {
        self.bvals.iter().position(|b| *b == 0.0)
    }

    /// 非零 b 值的个数.
    #[inline]
    pub fn weighted_len(&self) -> usize {
        self.bvals.iter().filter(|b| **b > 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gradient_table_orientation() {
        let g3 = array![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let t = GradientTable::new(g3).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.direction(1), [0.0, 1.0, 0.0]);

        let gn = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.6, 0.8, 0.0]];
        let t = GradientTable::new(gn).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.direction(3), [0.6, 0.8, 0.0]);
    }

    #[test]
    fn test_gradient_table_bad_shape() {
        let e = GradientTable::new(Array2::zeros((2, 5))).unwrap_err();
        assert!(matches!(e, FitError::GradientShape((2, 5))));
    }

    #[test]
    fn test_acquisition_b0() {
        let t = GradientTable::from_directions([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let acq = Acquisition::new(t, array![0.0, 1000.0, 1000.0]);
        assert_eq!(acq.first_b0(), Some(0));
        assert_eq!(acq.weighted_len(), 2);
        assert_eq!(acq.len(), 3);
    }

    #[test]
    #[should_panic]
    fn test_acquisition_negative_bval() {
        let t = GradientTable::from_directions([[1.0, 0.0, 0.0]]);
        Acquisition::new(t, array![-1.0]);
    }
}
