use crate::model::NodeDynamics;
use anyhow::{anyhow, Result};
use ndarray::{Array2, ArrayView1, ArrayViewMut1};

/// Linear node `x' = A x + u`; the network input acts on the first variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    a: Array2<f64>,
}

impl Linear {
    pub fn new(a: Array2<f64>) -> Result<Self> {
        if a.nrows() == 0 || a.nrows() != a.ncols() {
            return Err(anyhow!("System matrix must be square and non-empty, got {:?}", a.shape()));
        }
        Ok(Self { a })
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }
}

impl NodeDynamics for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn n_vars(&self) -> usize {
        self.a.nrows()
    }

    fn derivative(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
        mut out: ArrayViewMut1<f64>,
    ) {
        out.assign(&(self.a.dot(&x) + &input));
        out[0] += network_input;
    }

    fn state_jacobian(&self, _: ArrayView1<f64>, _: f64, _: ArrayView1<f64>) -> Array2<f64> {
        -&self.a
    }
}
