#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 对扩散加权 MRI (DWI) 数据逐体素拟合扩散张量 (DTI),
//! 并给出特征值/特征向量以及 ADC, FA 等标量图.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 拟合模型为对数线性化的单张量模型, 采用 "先 OLS 求权重, 再 WLS 求解" 的两步估计
//!   (Basser et al., 1994). 不提供非线性拟合或高阶模型.
//! 2. 输入的 4D 信号按 `(X, Y, Z, g)` 组织, 与梯度表、b 值按最后一维一一对应.
//! 3. 数值上的非期望情况 (例如特征分解失败) 以 [`FitError`] 返回,
//!   参数层面的非法输入 (例如 `batch_size == 0`) 则直接 panic.
//!
//! # 流水线
//!
//! ### 设计矩阵 ✅
//!
//! 由梯度方向和 b 值构造 `g x 7` 的设计矩阵 B. 梯度表缺失 b0 列时会尝试补零恢复,
//! 并以 [`Diagnostic`] 告知调用方.
//!
//! 实现位于 `dti-berry/src/design.rs`.
//!
//! ### OLS 加权估计 ✅
//!
//! 所有体素的对数信号一次性投影到 B 的列空间, 得到平滑后的信号估计,
//! 作为下一步的逐梯度权重. 可选 `i16` 定点存储以节省内存.
//!
//! 实现位于 `dti-berry/src/fit/ols.rs`.
//!
//! ### 逐体素 WLS ✅
//!
//! 实现位于 `dti-berry/src/fit/wls.rs`. 体素之间互不依赖, 开启 `rayon`
//! feature 后按批次并行.
//!
//! ### 特征分解与标量图 ✅
//!
//! 实现位于 `dti-berry/src/tensor/*`.
//!
//! ### 体素索引映射 ✅
//!
//! 紧凑体素列表与三维坐标之间的双向映射, 实现位于 `dti-berry/src/data/index.rs`.
//!
//! ### 读写 ✅
//!
//! NIfTI 4D DWI 读取, FSL bval/bvec 文本解析, 标量图的 NIfTI/npz 保存.
//!
//! 实现位于 `dti-berry/src/io/*`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 压缩存储优化时会用到. 该结构不对外公开.
type Idx3dU16 = (u16, u16, u16);

pub mod consts;

mod error;

pub use error::{Diagnostic, FitError, FitResult};

pub mod acquisition;

pub mod data;

pub use data::{Mask, VoxelIndex};

pub mod design;

mod linalg;

pub mod fit;

pub use fit::{FitOptions, WlsFit};

pub mod tensor;

pub use tensor::{DiffusionTensor, EigenResult};

pub mod progress;

mod volume;

pub use volume::TensorVolume;

pub mod io;

pub mod prelude;
