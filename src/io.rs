// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TomographyError};
use crate::geometry::Grid;

/// Supported file formats for array export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(TomographyError::UnsupportedFileFormat(ext.to_string())),
        None => Err(TomographyError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Recovered model as an `ny x nx` matrix, shallowest row first.
///
/// # Errors
/// Returns an error if `solution` does not have one entry per cell.
pub fn slowness_matrix(solution: &DVector<f64>, grid: &Grid) -> Result<DMatrix<f64>> {
    if solution.len() != grid.num_cells() {
        return Err(TomographyError::ShapeMismatch {
            expected: vec![grid.ny(), grid.nx()],
            got: vec![solution.len()],
        });
    }
    Ok(DMatrix::from_row_slice(
        grid.ny(),
        grid.nx(),
        solution.as_slice(),
    ))
}

/// Save a matrix as a 2-D row-major .npy array.
pub fn save_npy(matrix: &DMatrix<f64>, path: &Path) -> Result<()> {
    let arr = Array2::from_shape_fn(matrix.shape(), |(i, j)| matrix[(i, j)]);
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| TomographyError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

/// Save a vector as a 1-D .npy array.
pub fn save_npy_vector(vector: &DVector<f64>, path: &Path) -> Result<()> {
    let arr = Array1::from_iter(vector.iter().copied());
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| TomographyError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

/// Save a matrix as variable `var_name` in a MAT Level 5 file.
pub fn save_mat(matrix: &DMatrix<f64>, path: &Path, var_name: &str) -> Result<()> {
    // nalgebra storage is already column-major, which is what MAT expects
    let dims = [matrix.nrows(), matrix.ncols()];
    write_mat_level5(path, var_name, &dims, matrix.as_slice())
}

/// Save a matrix, inferring format from the extension. `var_name` is used
/// for .mat files only.
pub fn save_matrix(matrix: &DMatrix<f64>, path: &Path, var_name: &str) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(matrix, path)?,
        FileFormat::Mat => save_mat(matrix, path, var_name)?,
    }
    debug!(
        path = %path.display(),
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        "exported {}",
        var_name
    );
    Ok(())
}

/// Save a vector, inferring format from the extension. .mat files get a
/// column vector.
pub fn save_vector(vector: &DVector<f64>, path: &Path, var_name: &str) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy_vector(vector, path),
        FileFormat::Mat => write_mat_level5(path, var_name, &[vector.len(), 1], vector.as_slice()),
    }
}

/// Write any serializable value as pretty-printed JSON.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

// MAT Level 5 data types and array class used below.
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

/// Size on disk of a sub-element with `len` payload bytes: 8-byte tag plus
/// payload padded to 8 bytes.
fn element_size(len: usize) -> usize {
    8 + len.div_ceil(8) * 8
}

fn write_element<W: Write>(w: &mut W, data_type: u32, payload: &[u8]) -> Result<()> {
    w.write_all(&data_type.to_le_bytes())?;
    w.write_all(&(payload.len() as u32).to_le_bytes())?;
    w.write_all(payload)?;
    let pad = element_size(payload.len()) - 8 - payload.len();
    if pad > 0 {
        w.write_all(&[0u8; 8][..pad])?;
    }
    Ok(())
}

/// Minimal MAT-file Level 5 writer for a single real f64 array.
///
/// Layout: 128-byte header, then one miMATRIX element holding array flags,
/// dimensions, name and column-major data sub-elements.
fn write_mat_level5(path: &Path, var_name: &str, dimensions: &[usize], data: &[f64]) -> Result<()> {
    let expected: usize = dimensions.iter().product();
    if expected != data.len() {
        return Err(TomographyError::ShapeMismatch {
            expected: dimensions.to_vec(),
            got: vec![data.len()],
        });
    }

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // Header: 116 bytes of text, 8 bytes subsystem offset, version, endian marker
    let desc = b"MATLAB 5.0 MAT-file, created by crosswell-tomo";
    let mut header_text = [b' '; 116];
    let copy_len = desc.len().min(116);
    header_text[..copy_len].copy_from_slice(&desc[..copy_len]);
    w.write_all(&header_text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());

    let dims: Vec<u8> = dimensions
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    let name = var_name.as_bytes();
    let real: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();

    let matrix_size = element_size(flags.len())
        + element_size(dims.len())
        + element_size(name.len())
        + element_size(real.len());

    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&(matrix_size as u32).to_le_bytes())?;
    write_element(&mut w, MI_UINT32, &flags)?;
    write_element(&mut w, MI_INT32, &dims)?;
    write_element(&mut w, MI_INT8, name)?;
    write_element(&mut w, MI_DOUBLE, &real)?;

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn sample_matrix() -> DMatrix<f64> {
        DMatrix::from_fn(3, 4, |i, j| (i * 4 + j) as f64)
    }

    #[test]
    fn npy_matrix_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.npy");
        save_matrix(&sample_matrix(), &path, "observation_matrix").unwrap();

        let arr: Array2<f64> = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(arr.shape(), &[3, 4]);
        assert_eq!(arr[[1, 2]], 6.0);
        assert_eq!(arr[[2, 3]], 11.0);
    }

    #[test]
    fn npy_vector_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.npy");
        let v = DVector::from_vec(vec![3.0, 2.0, 1.0]);
        save_vector(&v, &path, "singular_values").unwrap();

        let arr: Array1<f64> = ndarray_npy::read_npy(&path).unwrap();
        assert_eq!(arr.to_vec(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn mat_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.mat");
        save_matrix(&sample_matrix(), &path, "observation_matrix").unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name("observation_matrix").unwrap();
        assert_eq!(arr.size(), &vec![3, 4]);

        match arr.data() {
            matfile::NumericData::Double { real, imag: _ } => {
                // Column-major: element (1, 2) sits at 2 * 3 + 1
                assert_eq!(real.len(), 12);
                assert_eq!(real[2 * 3 + 1], 6.0);
            }
            _ => panic!("Expected double data"),
        }
    }

    #[test]
    fn mat_element_padding() {
        assert_eq!(element_size(0), 8);
        assert_eq!(element_size(1), 16);
        assert_eq!(element_size(8), 16);
        assert_eq!(element_size(9), 24);
    }

    #[test]
    fn slowness_matrix_is_row_major_grid() {
        let grid = Grid::new(3, 2, 3.0, 2.0).unwrap();
        let solution = DVector::from_vec(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let m = slowness_matrix(&solution, &grid).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 0)], 3.0);

        let wrong = DVector::from_vec(vec![0.0; 5]);
        assert!(matches!(
            slowness_matrix(&wrong, &grid),
            Err(TomographyError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_json(&serde_json::json!({"rank": 3}), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rank"], 3);
    }

    #[test]
    fn unsupported_format() {
        let path = Path::new("test.xyz");
        let result = infer_format(path);
        assert!(matches!(
            result,
            Err(TomographyError::UnsupportedFileFormat(_))
        ));
    }
}
