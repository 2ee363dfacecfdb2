//! 通用常量.

/// 未提供显式 mask 时, b0 信号低于该值的体素不参与拟合.
pub const DEFAULT_B0_THRESHOLD: f64 = 5.0;

/// 默认的每批次体素个数.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// 设计矩阵的列数: 六个张量分量 + 截距 `ln(S0)`.
pub const DESIGN_COLS: usize = 7;

/// 对称张量的独立分量个数.
pub const TENSOR_COMPONENTS: usize = 6;

/// 打包后的特征分解结果长度: 3 个特征值 + 3 个三维特征向量.
pub const EIGEN_PACK_LEN: usize = 12;

/// 定点存储对数信号时的放大倍数 (保留 3 位小数).
pub const FIXED_POINT_FACTOR: f64 = 1000.0;

/// 非正信号在取对数前被替换成的值.
pub const SIGNAL_FLOOR: f32 = 1.0;

/// 伪逆的相对截断阈值, 与常见数值库的默认值一致.
pub const PINV_RCOND: f64 = 1e-15;

/// 张量分量在打包向量中的下标.
pub mod component {
    /// `Dxx`.
    pub const XX: usize = 0;

    /// `Dyy`.
    pub const YY: usize = 1;

    /// `Dzz`.
    pub const ZZ: usize = 2;

    /// `Dxy`.
    pub const XY: usize = 3;

    /// `Dxz`.
    pub const XZ: usize = 4;

    /// `Dyz`.
    pub const YZ: usize = 5;

    /// 截距 `ln(S0)`.
    pub const LOG_S0: usize = 6;
}
