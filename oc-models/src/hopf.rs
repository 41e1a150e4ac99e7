use crate::model::NodeDynamics;
use ndarray::{array, Array2, ArrayView1, ArrayViewMut1};
use oc_structs::config::HopfParams;

/// Stuart-Landau normal form of a Hopf bifurcation with state `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hopf {
    pub params: HopfParams,
}

impl Hopf {
    pub fn new(params: HopfParams) -> Self {
        Self { params }
    }
}

impl Default for Hopf {
    fn default() -> Self {
        Self::new(HopfParams::default())
    }
}

impl NodeDynamics for Hopf {
    fn name(&self) -> &'static str {
        "hopf"
    }

    fn n_vars(&self) -> usize {
        2
    }

    fn derivative(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
        mut out: ArrayViewMut1<f64>,
    ) {
        let (a, w) = (self.params.a, self.params.w);
        let (xv, yv) = (x[0], x[1]);
        let radial = a - xv * xv - yv * yv;
        out[0] = radial * xv - w * yv + network_input + input[0];
        out[1] = radial * yv + w * xv + input[1];
    }

    fn state_jacobian(&self, x: ArrayView1<f64>, _: f64, _: ArrayView1<f64>) -> Array2<f64> {
        let (a, w) = (self.params.a, self.params.w);
        let (xv, yv) = (x[0], x[1]);
        array![
            [-a + 3.0 * xv * xv + yv * yv, 2.0 * xv * yv + w],
            [2.0 * xv * yv - w, -a + xv * xv + 3.0 * yv * yv]
        ]
    }
}
