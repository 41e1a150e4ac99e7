use crate::{config::*, serializable_struct_with_getters};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    /// Explicit `N x V x T` target trajectory.
    Timeseries { values: Vec<Vec<Vec<f64>>> },
    /// `N x V x T` input that is simulated to produce the target trajectory.
    Injected { input: Vec<Vec<Vec<f64>>> },
}

serializable_struct_with_getters! {
    RunSettings {
        model: ModelConfig,
        simulation: SimulationConfig,
        network: Option<NetworkConfig>,
        #[serde(default)]
        optimizer: OptimizerConfig,
        target: TargetConfig,
        control_mask: Option<Vec<Vec<f64>>>,
        cost_mask: Option<Vec<Vec<f64>>>,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    }
}

fn default_max_iterations() -> usize {
    100
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    VanishingGradient,
    VanishingUpdate,
    Stagnation,
    MaxIterations,
}

impl TerminationReason {
    pub fn is_converged(&self) -> bool {
        !matches!(self, TerminationReason::MaxIterations)
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::VanishingGradient => write!(f, "gradient vanished"),
            TerminationReason::VanishingUpdate => write!(f, "control update vanished"),
            TerminationReason::Stagnation => write!(f, "step size search stagnated"),
            TerminationReason::MaxIterations => write!(f, "maximum iterations reached"),
        }
    }
}

serializable_struct_with_getters! {
    OptimizationOutput {
        model: String,
        control: Vec<Vec<Vec<f64>>>,
        cost_history: Vec<f64>,
        step_sizes_history: Vec<f64>,
        step_sizes_loops_history: Vec<usize>,
        termination: TerminationReason,
        iterations: usize,
        final_cost: f64,
        validation_cost: Option<f64>,
    }
}

serializable_struct_with_getters! {
    SimulationOutput {
        model: String,
        trajectory: Vec<Vec<Vec<f64>>>,
        cost: f64,
    }
}
