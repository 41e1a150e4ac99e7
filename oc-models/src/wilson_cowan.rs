use crate::model::{ControlMode, NodeDynamics};
use ndarray::{array, Array2, ArrayView1, ArrayViewMut1};
use oc_engine::OcResult;
use oc_structs::config::WilsonCowanParams;

fn sigmoid(x: f64, a: f64, mu: f64) -> f64 {
    1.0 / (1.0 + (-a * (x - mu)).exp())
}

fn sigmoid_derivative(x: f64, a: f64, mu: f64) -> f64 {
    let s = sigmoid(x, a, mu);
    a * s * (1.0 - s)
}

/// Wilson-Cowan excitatory/inhibitory population pair with state `(e, i)`.
///
/// The control is added to the background input inside the sigmoid, so its
/// Jacobian depends on the trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct WilsonCowan {
    pub params: WilsonCowanParams,
}

struct Drive {
    exc: f64,
    inh: f64,
}

impl WilsonCowan {
    pub fn new(params: WilsonCowanParams) -> Self {
        Self { params }
    }

    fn drive(&self, x: ArrayView1<f64>, network_input: f64, input: ArrayView1<f64>) -> Drive {
        let p = &self.params;
        Drive {
            exc: p.c_excexc * x[0] - p.c_inhexc * x[1] + network_input + input[0],
            inh: p.c_excinh * x[0] - p.c_inhinh * x[1] + input[1],
        }
    }
}

impl Default for WilsonCowan {
    fn default() -> Self {
        Self::new(WilsonCowanParams::default())
    }
}

impl NodeDynamics for WilsonCowan {
    fn name(&self) -> &'static str {
        "wilson_cowan"
    }

    fn n_vars(&self) -> usize {
        2
    }

    fn control_mode(&self) -> ControlMode {
        ControlMode::Additive
    }

    fn derivative(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
        mut out: ArrayViewMut1<f64>,
    ) {
        let p = &self.params;
        let drive = self.drive(x.view(), network_input, input);
        let (e, i) = (x[0], x[1]);
        out[0] = (-e + (1.0 - e) * sigmoid(drive.exc, p.a_exc, p.mu_exc)) / p.tau_exc;
        out[1] = (-i + (1.0 - i) * sigmoid(drive.inh, p.a_inh, p.mu_inh)) / p.tau_inh;
    }

    fn state_jacobian(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
    ) -> Array2<f64> {
        let p = &self.params;
        let drive = self.drive(x.view(), network_input, input);
        let (e, i) = (x[0], x[1]);
        let (s_e, ds_e) = (
            sigmoid(drive.exc, p.a_exc, p.mu_exc),
            sigmoid_derivative(drive.exc, p.a_exc, p.mu_exc),
        );
        let (s_i, ds_i) = (
            sigmoid(drive.inh, p.a_inh, p.mu_inh),
            sigmoid_derivative(drive.inh, p.a_inh, p.mu_inh),
        );
        array![
            [
                -(-1.0 - s_e + (1.0 - e) * p.c_excexc * ds_e) / p.tau_exc,
                -((1.0 - e) * -p.c_inhexc * ds_e) / p.tau_exc
            ],
            [
                -((1.0 - i) * p.c_excinh * ds_i) / p.tau_inh,
                -(-1.0 - s_i + (1.0 - i) * -p.c_inhinh * ds_i) / p.tau_inh
            ]
        ]
    }

    fn coupling_sensitivity(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
    ) -> f64 {
        let p = &self.params;
        let drive = self.drive(x.view(), network_input, input);
        (1.0 - x[0]) * sigmoid_derivative(drive.exc, p.a_exc, p.mu_exc) / p.tau_exc
    }

    fn constant_control_jacobian(&self) -> Option<Array2<f64>> {
        None
    }

    fn control_jacobian_at(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
    ) -> OcResult<Array2<f64>> {
        let p = &self.params;
        let drive = self.drive(x.view(), network_input, input);
        Ok(array![
            [
                -(1.0 - x[0]) * sigmoid_derivative(drive.exc, p.a_exc, p.mu_exc) / p.tau_exc,
                0.0
            ],
            [
                0.0,
                -(1.0 - x[1]) * sigmoid_derivative(drive.inh, p.a_inh, p.mu_inh) / p.tau_inh
            ]
        ])
    }
}
