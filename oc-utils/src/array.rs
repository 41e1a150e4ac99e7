use anyhow::{anyhow, Result};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

pub fn to_array2(rows: &Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(anyhow!("Rows must all have length {}", n_cols));
    }
    let flat = rows.iter().flatten().cloned().collect::<Vec<f64>>();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

pub fn to_array3(blocks: &Vec<Vec<Vec<f64>>>) -> Result<Array3<f64>> {
    let dim0 = blocks.len();
    let dim1 = blocks.first().map_or(0, |b| b.len());
    let dim2 = blocks
        .first()
        .and_then(|b| b.first())
        .map_or(0, |r| r.len());
    if blocks
        .iter()
        .any(|b| b.len() != dim1 || b.iter().any(|r| r.len() != dim2))
    {
        return Err(anyhow!(
            "Nested array is ragged, expected shape ({}, {}, {})",
            dim0,
            dim1,
            dim2
        ));
    }
    let flat = blocks
        .iter()
        .flatten()
        .flatten()
        .cloned()
        .collect::<Vec<f64>>();
    Ok(Array3::from_shape_vec((dim0, dim1, dim2), flat)?)
}

pub fn from_array2(arr: ArrayView2<f64>) -> Vec<Vec<f64>> {
    arr.outer_iter().map(|row| row.to_vec()).collect()
}

pub fn from_array3(arr: ArrayView3<f64>) -> Vec<Vec<Vec<f64>>> {
    arr.outer_iter().map(|block| from_array2(block)).collect()
}
