//! 批次大小与对数信号定点存储对拟合耗时和精度的影响.
//!
//! 默认在合成体模上运行; 若 `$DTI_DWI_DIR` (或 `$HOME/dataset/dwi`) 下存在
//! `dwi.nii.gz`, `dwi.bval`, `dwi.bvec`, 则改用真实数据.

mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger initialization error");

    runner::run().analyze();
}
