use crate::{network::Network, noise::OrnsteinUhlenbeck};
use anyhow::{anyhow, Result};
use ndarray::{s, Array1, Array2, Array3, Array4, Array5, ArrayView1, ArrayView3, ArrayViewMut1};
use oc_engine::{ControlJacobian, Dynamics, Jacobians, OcError, OcResult, SystemShape};
use oc_structs::config::NoiseConfig;

/// How the optimized control enters a model's external input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlMode {
    /// The control is the external input.
    Replace,
    /// The control is added to a fixed background input.
    Additive,
}

/// Local dynamics `x' = f(x, network_input, input)` of one node.
///
/// `input` holds one entry per controllable variable. Jacobians follow the
/// `-df/dx` convention of [`Jacobians`].
pub trait NodeDynamics {
    fn name(&self) -> &'static str;

    fn n_vars(&self) -> usize;

    fn control_mode(&self) -> ControlMode {
        ControlMode::Replace
    }

    fn derivative(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
        out: ArrayViewMut1<f64>,
    );

    /// `-df/dx`, `V x V`.
    fn state_jacobian(
        &self,
        x: ArrayView1<f64>,
        network_input: f64,
        input: ArrayView1<f64>,
    ) -> Array2<f64>;

    /// `d f_0 / d network_input`.
    fn coupling_sensitivity(
        &self,
        _x: ArrayView1<f64>,
        _network_input: f64,
        _input: ArrayView1<f64>,
    ) -> f64 {
        1.0
    }

    /// `-df/du` when it does not depend on the state.
    fn constant_control_jacobian(&self) -> Option<Array2<f64>> {
        Some(-Array2::<f64>::eye(self.n_vars()))
    }

    /// `-df/du` at one node and time point, `V x V`.
    fn control_jacobian_at(
        &self,
        _x: ArrayView1<f64>,
        _network_input: f64,
        _input: ArrayView1<f64>,
    ) -> OcResult<Array2<f64>> {
        Err(OcError::JacobianNotImplemented {
            model: self.name(),
            jacobian: "control",
        })
    }
}

/// Network of identical nodes integrated with explicit Euler and optional
/// Ornstein-Uhlenbeck noise.
#[derive(Debug, Clone)]
pub struct NetworkModel<D: NodeDynamics> {
    node: D,
    network: Network,
    dt: f64,
    initial_state: Array2<f64>,
    /// External input for `ControlMode::Replace`, background otherwise.
    external_input: Array3<f64>,
    input: Array3<f64>,
    noise: OrnsteinUhlenbeck,
    state: Array3<f64>,
    network_input: Array2<f64>,
}

impl<D: NodeDynamics> NetworkModel<D> {
    pub fn new(node: D, network: Network, dt: f64, n_steps: usize) -> Result<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(anyhow!("dt must be positive, got {}", dt));
        }
        if n_steps < 2 {
            return Err(anyhow!("Simulation needs at least 2 time points, got {}", n_steps));
        }
        let n_nodes = network.n_nodes();
        let n_vars = node.n_vars();
        Ok(Self {
            noise: OrnsteinUhlenbeck::new(&NoiseConfig::default(), n_nodes, n_vars)?,
            initial_state: Array2::zeros((n_nodes, n_vars)),
            external_input: Array3::zeros((n_nodes, n_vars, n_steps)),
            input: Array3::zeros((n_nodes, n_vars, n_steps)),
            state: Array3::zeros((n_nodes, n_vars, n_steps)),
            network_input: Array2::zeros((n_nodes, n_steps)),
            node,
            network,
            dt,
        })
    }

    pub fn with_initial_state(mut self, initial_state: Array2<f64>) -> Result<Self> {
        if initial_state.dim() != self.initial_state.dim() {
            return Err(anyhow!(
                "Initial state must have shape {:?}, got {:?}",
                self.initial_state.shape(),
                initial_state.shape()
            ));
        }
        self.initial_state = initial_state;
        Ok(self)
    }

    /// Sets the external input (or background) and resets the control to it.
    pub fn with_external_input(mut self, external_input: Array3<f64>) -> Result<Self> {
        if external_input.dim() != self.input.dim() {
            return Err(anyhow!(
                "External input must have shape {:?}, got {:?}",
                self.input.shape(),
                external_input.shape()
            ));
        }
        self.input.assign(&external_input);
        self.external_input = external_input;
        Ok(self)
    }

    pub fn with_noise(mut self, config: &NoiseConfig) -> Result<Self> {
        let (n_nodes, n_vars) = self.initial_state.dim();
        self.noise = OrnsteinUhlenbeck::new(config, n_nodes, n_vars)?;
        Ok(self)
    }

    pub fn node(&self) -> &D {
        &self.node
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Input the last simulation was driven with.
    pub fn input(&self) -> &Array3<f64> {
        &self.input
    }

    /// Full state of the last simulation, `N x V x T`.
    pub fn state(&self) -> &Array3<f64> {
        &self.state
    }

    fn derivative_inputs(&self, n: usize, t: usize) -> (ArrayView1<f64>, f64, ArrayView1<f64>) {
        (
            self.state.slice(s![n, .., t]),
            self.network_input[[n, t]],
            self.input.slice(s![n, .., t]),
        )
    }
}

impl<D: NodeDynamics> Dynamics for NetworkModel<D> {
    fn name(&self) -> &'static str {
        self.node.name()
    }

    fn shape(&self) -> SystemShape {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        SystemShape {
            n_nodes,
            n_state_vars: n_vars,
            n_output_vars: n_vars,
            n_steps,
        }
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn is_stochastic(&self) -> bool {
        self.noise.is_active()
    }

    fn initial_control(&self) -> Array3<f64> {
        match self.node.control_mode() {
            ControlMode::Replace => self.input.clone(),
            ControlMode::Additive => &self.input - &self.external_input,
        }
    }

    fn apply_control(&mut self, control: &Array3<f64>) {
        match self.node.control_mode() {
            ControlMode::Replace => self.input.assign(control),
            ControlMode::Additive => self.input = &self.external_input + control,
        }
    }

    fn simulate(&mut self) {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        self.noise.reset();
        self.state.fill(0.0);
        self.state.slice_mut(s![.., .., 0]).assign(&self.initial_state);

        let mut derivative = Array1::<f64>::zeros(n_vars);
        for t in 0..n_steps {
            for n in 0..n_nodes {
                self.network_input[[n, t]] = self.network.input(self.state.slice(s![.., 0, t]), n);
            }
            if t + 1 == n_steps {
                break;
            }
            for n in 0..n_nodes {
                let (x, network_input, input) = self.derivative_inputs(n, t);
                self.node
                    .derivative(x, network_input, input, derivative.view_mut());
                for v in 0..n_vars {
                    self.state[[n, v, t + 1]] = self.state[[n, v, t]]
                        + self.dt * (derivative[v] + self.noise.state()[[n, v]]);
                }
            }
            self.noise.advance(self.dt);
        }
    }

    fn trajectory(&self) -> ArrayView3<f64> {
        self.state.view()
    }
}

impl<D: NodeDynamics> Jacobians for NetworkModel<D> {
    fn local_jacobian(&self) -> OcResult<Array4<f64>> {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        let mut hx = Array4::zeros((n_nodes, n_steps, n_vars, n_vars));
        for n in 0..n_nodes {
            for t in 0..n_steps {
                let (x, network_input, input) = self.derivative_inputs(n, t);
                hx.slice_mut(s![n, t, .., ..])
                    .assign(&self.node.state_jacobian(x, network_input, input));
            }
        }
        Ok(hx)
    }

    fn coupling_jacobian(&self) -> OcResult<Array5<f64>> {
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        let mut sensitivity = Array2::zeros((n_nodes, n_steps));
        for n in 0..n_nodes {
            for t in 0..n_steps {
                let (x, network_input, input) = self.derivative_inputs(n, t);
                sensitivity[[n, t]] = self.node.coupling_sensitivity(x, network_input, input);
            }
        }
        Ok(self.network.jacobian(&sensitivity, n_vars))
    }

    fn control_jacobian(&self) -> OcResult<ControlJacobian> {
        if let Some(d_du) = self.node.constant_control_jacobian() {
            return Ok(ControlJacobian::Constant(d_du));
        }
        let (n_nodes, n_vars, n_steps) = self.state.dim();
        let mut d_du = Array4::zeros((n_nodes, n_vars, n_vars, n_steps));
        for n in 0..n_nodes {
            for t in 0..n_steps {
                let (x, network_input, input) = self.derivative_inputs(n, t);
                d_du.slice_mut(s![n, .., .., t])
                    .assign(&self.node.control_jacobian_at(x, network_input, input)?);
            }
        }
        Ok(ControlJacobian::TimeVarying(d_du))
    }
}
