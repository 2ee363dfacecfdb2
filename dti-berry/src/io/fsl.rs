use std::fs;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};

use super::IoError;
use crate::acquisition::{Acquisition, GradientTable};
use crate::FitError;

/// 把空白分隔的文本解析为按行组织的数值. 空行被忽略.
fn parse_rows(text: &str) -> Result<Vec<(usize, Vec<f64>)>, IoError> {
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| IoError::Parse {
                    line: n + 1,
                    token: tok.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !row.is_empty() {
            rows.push((n + 1, row));
        }
    }
    Ok(rows)
}

/// 解析 FSL 格式的 b 值文本. 所有数值按出现顺序拼接, 不区分行.
pub fn parse_bvals(text: &str) -> Result<Array1<f64>, IoError> {
    let bvals: Array1<f64> = parse_rows(text)?
        .into_iter()
        .flat_map(|(_, row)| row)
        .collect();
    if let Some((index, &value)) = bvals
        .iter()
        .enumerate()
        .find(|(_, b)| !b.is_finite() || **b < 0.0)
    {
        return Err(IoError::InvalidBValue { index, value });
    }
    Ok(bvals)
}

/// 解析 FSL 格式的梯度方向文本. 接受 `3 x g` 或 `g x 3` 的排列.
pub fn parse_bvecs(text: &str) -> Result<GradientTable, IoError> {
    let rows = parse_rows(text)?;
    let cols = rows.first().map_or(0, |(_, r)| r.len());
    let mut flat = Vec::with_capacity(rows.len() * cols);
    for (line, row) in rows.iter() {
        if row.len() != cols {
            return Err(IoError::Ragged {
                line: *line,
                expected: cols,
                found: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }
    let data = Array2::from_shape_vec((rows.len(), cols), flat)?;
    Ok(GradientTable::new(data)?)
}

/// 从文件读取 b 值, 见 [`parse_bvals`].
pub fn read_fsl_bvals<P: AsRef<Path>>(path: P) -> Result<Array1<f64>, IoError> {
    parse_bvals(&fs::read_to_string(path)?)
}

/// 从文件读取梯度方向, 见 [`parse_bvecs`].
pub fn read_fsl_bvecs<P: AsRef<Path>>(path: P) -> Result<GradientTable, IoError> {
    parse_bvecs(&fs::read_to_string(path)?)
}

/// 同时读取 b 值与梯度方向.
///
/// 两者个数不一致时不会报错: 设计矩阵构造阶段会尝试补零恢复并给出诊断.
pub fn read_acquisition(
    bvals: impl AsRef<Path>,
    bvecs: impl AsRef<Path>,
) -> Result<Acquisition, IoError> {
    let b = read_fsl_bvals(bvals)?;
    let g = read_fsl_bvecs(bvecs)?;
    if b.is_empty() {
        return Err(FitError::EmptyAcquisition.into());
    }
    debug!("read {} b-values, {} gradient directions", b.len(), g.len());
    Ok(Acquisition::new(g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bvals() {
        let b = parse_bvals("0 1000 1000\n\n 1000  0\n").unwrap();
        assert_eq!(b.to_vec(), vec![0.0, 1000.0, 1000.0, 1000.0, 0.0]);

        assert!(matches!(
            parse_bvals("0 abc"),
            Err(IoError::Parse { line: 1, ref token }) if token == "abc"
        ));
        assert!(matches!(
            parse_bvals("0 -5"),
            Err(IoError::InvalidBValue { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_bvecs_orientation() {
        let three_by_g = "0 1 0 0\n0 0 1 0\n0 0 0 1\n";
        let g_by_three = "0 0 0\n1 0 0\n0 1 0\n0 0 1\n";
        let a = parse_bvecs(three_by_g).unwrap();
        let b = parse_bvecs(g_by_three).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
        assert_eq!(a.direction(2), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_parse_bvecs_ragged() {
        assert!(matches!(
            parse_bvecs("0 1 0\n0 0\n0 0 1"),
            Err(IoError::Ragged {
                line: 2,
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            parse_bvecs("0 1\n1 0\n"),
            Err(IoError::Fit(FitError::GradientShape((2, 2))))
        ));
    }

    #[test]
    fn test_read_acquisition_files() {
        let dir = std::env::temp_dir().join(format!("dti-berry-fsl-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let bval = dir.join("dwi.bval");
        let bvec = dir.join("dwi.bvec");
        fs::write(&bval, "0 1000 1000 1000\n").unwrap();
        fs::write(&bvec, "0 1 0 0\n0 0 1 0\n0 0 0 1\n").unwrap();

        let acq = read_acquisition(&bval, &bvec).unwrap();
        assert_eq!(acq.len(), 4);
        assert_eq!(acq.first_b0(), Some(0));

        fs::write(&bval, "\n").unwrap();
        assert!(matches!(
            read_acquisition(&bval, &bvec),
            Err(IoError::Fit(FitError::EmptyAcquisition))
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
