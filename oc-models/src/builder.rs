use crate::{
    fhn::FitzHughNagumo,
    hopf::Hopf,
    linear::Linear,
    model::{NetworkModel, NodeDynamics},
    network::Network,
    wilson_cowan::WilsonCowan,
};
use anyhow::{anyhow, Result};
use log::debug;
use ndarray::{Array3, Array4, Array5, ArrayView3};
use oc_engine::{ControlJacobian, Dynamics, Jacobians, OcResult, SystemShape};
use oc_structs::{
    config::{ModelConfig, NetworkConfig, SimulationConfig},
    core::TargetConfig,
};
use oc_utils::{to_array2, to_array3};

/// Any of the supported models, selected at runtime from a [`ModelConfig`].
#[derive(Debug, Clone)]
pub enum AnyModel {
    Fhn(NetworkModel<FitzHughNagumo>),
    Hopf(NetworkModel<Hopf>),
    WilsonCowan(NetworkModel<WilsonCowan>),
    Linear(NetworkModel<Linear>),
}

macro_rules! dispatch {
    ($self:ident, $model:ident => $body:expr) => {
        match $self {
            AnyModel::Fhn($model) => $body,
            AnyModel::Hopf($model) => $body,
            AnyModel::WilsonCowan($model) => $body,
            AnyModel::Linear($model) => $body,
        }
    };
}

impl AnyModel {
    pub fn from_config(
        model: &ModelConfig,
        simulation: &SimulationConfig,
        network: Option<&NetworkConfig>,
    ) -> Result<Self> {
        Ok(match model {
            ModelConfig::Fhn(params) => Self::Fhn(build_network_model(
                FitzHughNagumo::new(params.clone()),
                simulation,
                network,
            )?),
            ModelConfig::Hopf(params) => {
                Self::Hopf(build_network_model(Hopf::new(params.clone()), simulation, network)?)
            }
            ModelConfig::WilsonCowan(params) => {
                let mut model =
                    build_network_model(WilsonCowan::new(params.clone()), simulation, network)?;
                if let Some(background) = &params.background {
                    model = model.with_external_input(to_array3(background)?)?;
                }
                Self::WilsonCowan(model)
            }
            ModelConfig::Linear(params) => Self::Linear(build_network_model(
                Linear::new(to_array2(&params.a)?)?,
                simulation,
                network,
            )?),
        })
    }

    /// Full state of the last simulation, `N x V x T`.
    pub fn state(&self) -> &Array3<f64> {
        dispatch!(self, m => m.state())
    }
}

/// Network model with the time grid, initial state, noise and coupling of
/// the given settings. Without a network config the model is a single node.
pub fn build_network_model<D: NodeDynamics>(
    node: D,
    simulation: &SimulationConfig,
    network: Option<&NetworkConfig>,
) -> Result<NetworkModel<D>> {
    if !(simulation.duration > 0.0) || !(simulation.dt > 0.0) {
        return Err(anyhow!(
            "duration and dt must be positive, got duration {} and dt {}",
            simulation.duration,
            simulation.dt
        ));
    }
    let network = match network {
        Some(config) => Network::from_config(config)?,
        None => Network::single_node(),
    };
    let mut model = NetworkModel::new(node, network, simulation.dt, simulation.num_steps())?
        .with_noise(&simulation.noise)?;
    if let Some(initial_state) = &simulation.initial_state {
        model = model.with_initial_state(to_array2(initial_state)?)?;
    }
    let shape = model.shape();
    debug!(
        "Built '{}' model with {} nodes, {} variables and {} time points",
        model.name(),
        shape.n_nodes,
        shape.n_state_vars,
        shape.n_steps
    );
    Ok(model)
}

/// Resolves a target trajectory. An injected input is simulated once and the
/// system's control is restored afterwards.
pub fn resolve_target<S: Dynamics>(system: &mut S, target: &TargetConfig) -> Result<Array3<f64>> {
    let shape = system.shape();
    let expected = (shape.n_nodes, shape.n_output_vars, shape.n_steps);
    let (what, values) = match target {
        TargetConfig::Timeseries { values } => ("Target", to_array3(values)?),
        TargetConfig::Injected { input } => ("Injected input", to_array3(input)?),
    };
    if values.dim() != expected {
        return Err(anyhow!(
            "{} must have shape {:?}, got {:?}",
            what,
            expected,
            values.shape()
        ));
    }
    match target {
        TargetConfig::Timeseries { .. } => Ok(values),
        TargetConfig::Injected { .. } => Ok(simulate_with_input(system, &values)),
    }
}

/// Trajectory under `input`, leaving the system's control as it was.
pub fn simulate_with_input<S: Dynamics>(system: &mut S, input: &Array3<f64>) -> Array3<f64> {
    let control = system.initial_control();
    system.apply_control(input);
    system.simulate();
    let trajectory = system.trajectory().to_owned();
    system.apply_control(&control);
    trajectory
}

impl Dynamics for AnyModel {
    fn name(&self) -> &'static str {
        dispatch!(self, m => m.name())
    }

    fn shape(&self) -> SystemShape {
        dispatch!(self, m => m.shape())
    }

    fn dt(&self) -> f64 {
        dispatch!(self, m => m.dt())
    }

    fn is_stochastic(&self) -> bool {
        dispatch!(self, m => m.is_stochastic())
    }

    fn initial_control(&self) -> Array3<f64> {
        dispatch!(self, m => m.initial_control())
    }

    fn apply_control(&mut self, control: &Array3<f64>) {
        dispatch!(self, m => m.apply_control(control))
    }

    fn simulate(&mut self) {
        dispatch!(self, m => m.simulate())
    }

    fn trajectory(&self) -> ArrayView3<f64> {
        dispatch!(self, m => m.trajectory())
    }
}

impl Jacobians for AnyModel {
    fn local_jacobian(&self) -> OcResult<Array4<f64>> {
        dispatch!(self, m => m.local_jacobian())
    }

    fn coupling_jacobian(&self) -> OcResult<Array5<f64>> {
        dispatch!(self, m => m.coupling_jacobian())
    }

    fn control_jacobian(&self) -> OcResult<ControlJacobian> {
        dispatch!(self, m => m.control_jacobian())
    }
}
