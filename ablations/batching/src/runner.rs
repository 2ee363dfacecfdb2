//! 程序运行函数.

use std::thread;

use dti_berry::prelude::*;
use log::info;
use ndarray::{Array2, Array4, ArrayView2, Axis};
use utils::{loader, phantom};

use crate::profile::Profile;
use crate::result::AblationResult;

/// 每组配置重复拟合的次数.
const REPEATS: usize = 3;

/// 合成体模的梯度方向个数.
const PHANTOM_DIRECTIONS: usize = 30;

/// 优先加载真实数据, 否则生成合成体模.
fn load() -> (Array4<f32>, Acquisition) {
    match loader::dwi_case_from_env_or_home() {
        Some(Ok((scan, acq))) => {
            info!("using DWI scan {:?}", scan.shape());
            (scan.data().to_owned(), acq)
        }
        Some(Err(e)) => panic!("Loading DWI case error: {e}"),
        None => {
            let side = loader::phantom_side_from_env();
            info!("using synthetic phantom, side = {side}");
            phantom::ball(side, PHANTOM_DIRECTIONS)
        }
    }
}

/// 两组 `V x 12` 结果之间 FA 与特征值的最大绝对偏差.
fn deviation(a: ArrayView2<f64>, b: ArrayView2<f64>) -> (f64, f64) {
    let mut fa = 0.0f64;
    let mut evals = 0.0f64;
    for (x, y) in a.outer_iter().zip(b.outer_iter()) {
        let (x, y) = (EigenResult::unpack(x), EigenResult::unpack(y));
        fa = fa.max((x.fa() - y.fa()).abs());
        for (p, q) in x.values.iter().zip(y.values.iter()) {
            evals = evals.max((p - q).abs());
        }
    }
    (fa, evals)
}

/// 以 `opts` 重复拟合整个紧凑信号.
fn profile_config(
    compact: &Array2<f32>,
    acq: &Acquisition,
    opts: &FitOptions,
    reference: ArrayView2<f64>,
) -> Profile {
    let mut p = Profile::new(compact.nrows());
    for _ in 0..REPEATS {
        p.fit_start();
        let fit = fit_voxels(compact.view(), acq, opts, &FitControl::silent())
            .expect("Fitting error");
        p.fit_elapsed();
        let (fa, evals) = deviation(fit.eigen(), reference);
        p.record_deviation(fa, evals);
    }
    p.finish()
}

/// 把紧凑信号按行切成 `cpus()` 份, 每份由一个 scoped 线程独立拟合.
fn profile_scoped(compact: &Array2<f32>, acq: &Acquisition, reference: ArrayView2<f64>) -> Profile {
    let rows = compact.nrows().div_ceil(utils::cpus()).max(1);
    let opts = &FitOptions::default();
    let mut p = Profile::new(compact.nrows());
    for _ in 0..REPEATS {
        p.fit_start();
        let parts: Vec<WlsFit> = thread::scope(|s| {
            let handles: Vec<_> = compact
                .axis_chunks_iter(Axis(0), rows)
                .map(|chunk| {
                    s.spawn(move || {
                        fit_voxels(chunk, acq, opts, &FitControl::silent()).expect("Fitting error")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|th| th.join().expect("Thread joining error"))
                .collect()
        });
        p.fit_elapsed();

        let views: Vec<_> = parts.iter().map(|f| f.eigen()).collect();
        let eigen = ndarray::concatenate(Axis(0), &views).expect("Concatenating results error");
        let (fa, evals) = deviation(eigen.view(), reference);
        p.record_deviation(fa, evals);
    }
    p.finish()
}

/// 实际运行.
pub fn run() -> AblationResult {
    let (signal, acq) = load();
    let index = VoxelIndex::from_mask(&Mask::from_signal(signal.view(), DEFAULT_B0_THRESHOLD));
    assert!(!index.is_empty(), "No voxel passes the b0 threshold");
    let compact = index.gather(signal.view());
    drop(signal);

    println!(
        "Running ablation studies on {} voxels, {} gradients, {} cpus...",
        index.len(),
        acq.len(),
        utils::cpus()
    );
    let reference = fit_voxels(
        compact.view(),
        &acq,
        &FitOptions::default(),
        &FitControl::silent(),
    )
    .expect("Fitting error");

    let mut profiles = Vec::new();
    for quantize in [false, true] {
        for batch in loader::batch_sizes_from_env() {
            let opts = FitOptions::default()
                .with_batch_size(batch)
                .with_quantize(quantize);
            let name = match quantize {
                true => format!("batch = {batch}, quantized"),
                false => format!("batch = {batch}"),
            };
            profiles.push((name, profile_config(&compact, &acq, &opts, reference.eigen())));
        }
    }
    profiles.push((
        format!("scoped x {}", utils::cpus()),
        profile_scoped(&compact, &acq, reference.eigen()),
    ));
    profiles.into_iter().collect()
}
