use crate::error::OcResult;
use ndarray::{Array2, Array3, Array4, Array5, ArrayView3};

/// Extent of a simulated network model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SystemShape {
    pub n_nodes: usize,
    /// Variables the Jacobians are expressed in.
    pub n_state_vars: usize,
    /// Controllable/observable variables, a leading subset of the state variables.
    pub n_output_vars: usize,
    /// Time points including the initial condition.
    pub n_steps: usize,
}

impl SystemShape {
    pub fn state_dim(&self) -> (usize, usize, usize) {
        (self.n_nodes, self.n_state_vars, self.n_steps)
    }

    pub fn control_dim(&self) -> (usize, usize, usize) {
        (self.n_nodes, self.n_output_vars, self.n_steps)
    }
}

/// Derivative of the dynamics with respect to the control input.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlJacobian {
    /// `V x V`, identical for every node and time step.
    Constant(Array2<f64>),
    /// `N x V x V x T`.
    TimeVarying(Array4<f64>),
}

/// Forward simulator driven by an external control signal.
///
/// The adapter owns its input configuration. `apply_control` is the only way
/// the optimizer writes into it, and must be called before `simulate` for the
/// new control to take effect.
pub trait Dynamics {
    fn name(&self) -> &'static str;

    fn shape(&self) -> SystemShape;

    fn dt(&self) -> f64;

    /// Whether repeated simulations with the same control differ.
    fn is_stochastic(&self) -> bool {
        false
    }

    /// Control encoded in the current input configuration, `N x V_out x T`.
    fn initial_control(&self) -> Array3<f64>;

    fn apply_control(&mut self, control: &Array3<f64>);

    /// Re-runs the simulation from the initial condition. Stochastic models
    /// draw a fresh noise realization on every call.
    fn simulate(&mut self);

    /// Output-variable trajectory of the last simulation including the
    /// initial condition, `N x V_out x T`.
    fn trajectory(&self) -> ArrayView3<f64>;
}

/// Linearization of the dynamics around the last simulated trajectory.
///
/// All derivatives follow the residual convention `h = -f` for `x' = f(x, u)`:
/// the local Jacobian is `-df/dx`, the coupling Jacobian entry `[n1, n2]` is
/// `-d f_{n1} / d x_{n2}` and the control Jacobian is `-df/du`.
pub trait Jacobians {
    /// `N x T x V x V`.
    fn local_jacobian(&self) -> OcResult<Array4<f64>>;

    /// `N x N x T x V x V`.
    fn coupling_jacobian(&self) -> OcResult<Array5<f64>>;

    fn control_jacobian(&self) -> OcResult<ControlJacobian>;
}

pub trait ControlledSystem: Dynamics + Jacobians {}

impl<T: Dynamics + Jacobians> ControlledSystem for T {}
