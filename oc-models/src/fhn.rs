use crate::model::NodeDynamics;
use ndarray::{array, Array2, ArrayView1, ArrayViewMut1};
use oc_structs::config::FhnParams;

/// FitzHugh-Nagumo oscillator with state `(x, y)`.
///
/// ```text
/// x' = -alpha x^3 + beta x^2 + gamma x - y + network + u_x
/// y' = (x - delta - epsilon y) / tau + u_y
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FitzHughNagumo {
    pub params: FhnParams,
}

impl FitzHughNagumo {
    pub fn new(params: FhnParams) -> Self {
        Self { params }
    }
}

impl Default for FitzHughNagumo {
    fn default() -> Self {
        Self::new(FhnParams::default())
    }
}

impl NodeDynamics for FitzHughNagumo {
    fn name(&self) -> &'static str {
        "fhn"
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
        let p = &self.params;
        let (xv, yv) = (x[0], x[1]);
        out[0] = -p.alpha * xv.powi(3) + p.beta * xv.powi(2) + p.gamma * xv - yv
            + network_input
            + input[0];
        out[1] = (xv - p.delta - p.epsilon * yv) / p.tau + input[1];
    }

    fn state_jacobian(&self, x: ArrayView1<f64>, _: f64, _: ArrayView1<f64>) -> Array2<f64> {
        let p = &self.params;
        let xv = x[0];
        array![
            [3.0 * p.alpha * xv.powi(2) - 2.0 * p.beta * xv - p.gamma, 1.0],
            [-1.0 / p.tau, p.epsilon / p.tau]
        ]
    }
}
