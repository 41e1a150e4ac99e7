use crate::serializable_struct_with_getters;
use serde::{Deserialize, Serialize};

pub use oc_utils::Interval;

serializable_struct_with_getters! {
    CostWeights {
        #[serde(default = "default_w_p")]
        w_p: f64,
        #[serde(default)]
        w_2: f64,
        #[serde(default)]
        w_1: f64,
    }
}

fn default_w_p() -> f64 {
    1.0
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            w_p: default_w_p(),
            w_2: 0.0,
            w_1: 0.0,
        }
    }
}

serializable_struct_with_getters! {
    OptimizerConfig {
        #[serde(default)]
        weights: CostWeights,
        maximum_control_strength: Option<f64>,
        #[serde(default)]
        cost_interval: Interval,
        #[serde(default)]
        print_array: Vec<usize>,
        #[serde(default = "default_noise_realizations")]
        num_noise_realizations: usize,
        #[serde(default)]
        num_validation_realizations: usize,
        #[serde(default)]
        validate_per_step: bool,
        #[serde(default = "default_initial_step")]
        initial_step: f64,
        #[serde(default = "default_factor_down")]
        factor_down: f64,
        #[serde(default = "default_factor_up")]
        factor_up: f64,
        #[serde(default = "default_count_step")]
        count_step: usize,
        #[serde(default = "default_count_noisy_step")]
        count_noisy_step: usize,
        #[serde(default = "default_max_stabilization_steps")]
        max_stabilization_steps: usize,
        #[serde(default = "default_convergence_tolerance")]
        convergence_tolerance: f64,
    }
}

fn default_noise_realizations() -> usize {
    1
}
fn default_initial_step() -> f64 {
    10.0
}
fn default_factor_down() -> f64 {
    0.5
}
fn default_factor_up() -> f64 {
    2.0
}
fn default_count_step() -> usize {
    20
}
fn default_count_noisy_step() -> usize {
    10
}
fn default_max_stabilization_steps() -> usize {
    50
}
fn default_convergence_tolerance() -> f64 {
    1e-16
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            maximum_control_strength: None,
            cost_interval: Interval::full(),
            print_array: Vec::new(),
            num_noise_realizations: default_noise_realizations(),
            num_validation_realizations: 0,
            validate_per_step: false,
            initial_step: default_initial_step(),
            factor_down: default_factor_down(),
            factor_up: default_factor_up(),
            count_step: default_count_step(),
            count_noisy_step: default_count_noisy_step(),
            max_stabilization_steps: default_max_stabilization_steps(),
            convergence_tolerance: default_convergence_tolerance(),
        }
    }
}

impl OptimizerConfig {
    pub fn is_stochastic(&self) -> bool {
        self.num_noise_realizations > 1
    }

    /// Realizations used for validation, falling back to the optimization
    /// count when none were configured.
    pub fn validation_realizations(&self) -> usize {
        if self.num_validation_realizations == 0 {
            self.num_noise_realizations.max(1)
        } else {
            self.num_validation_realizations
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Coupling {
    #[default]
    Additive,
    Diffusive,
}

serializable_struct_with_getters! {
    NetworkConfig {
        cmat: Vec<Vec<f64>>,
        #[serde(default)]
        k_gl: f64,
        #[serde(default)]
        coupling: Coupling,
    }
}

serializable_struct_with_getters! {
    NoiseConfig {
        #[serde(default)]
        sigma_ou: f64,
        #[serde(default = "default_tau_ou")]
        tau_ou: f64,
        #[serde(default)]
        mean: f64,
        #[serde(default)]
        seed: u64,
    }
}

fn default_tau_ou() -> f64 {
    5.0
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sigma_ou: 0.0,
            tau_ou: default_tau_ou(),
            mean: 0.0,
            seed: 0,
        }
    }
}

serializable_struct_with_getters! {
    SimulationConfig {
        #[serde(default = "default_dt")]
        dt: f64,
        duration: f64,
        initial_state: Option<Vec<Vec<f64>>>,
        #[serde(default)]
        noise: NoiseConfig,
    }
}

fn default_dt() -> f64 {
    0.1
}

impl SimulationConfig {
    /// Number of time points including the initial state.
    pub fn num_steps(&self) -> usize {
        (self.duration / self.dt).round() as usize + 1
    }
}

serializable_struct_with_getters! {
    FhnParams {
        #[serde(default = "default_fhn_alpha")]
        alpha: f64,
        #[serde(default = "default_fhn_beta")]
        beta: f64,
        #[serde(default = "default_fhn_gamma")]
        gamma: f64,
        #[serde(default)]
        delta: f64,
        #[serde(default = "default_fhn_epsilon")]
        epsilon: f64,
        #[serde(default = "default_fhn_tau")]
        tau: f64,
    }
}

fn default_fhn_alpha() -> f64 {
    3.0
}
fn default_fhn_beta() -> f64 {
    4.0
}
fn default_fhn_gamma() -> f64 {
    -1.5
}
fn default_fhn_epsilon() -> f64 {
    0.5
}
fn default_fhn_tau() -> f64 {
    20.0
}

impl Default for FhnParams {
    fn default() -> Self {
        Self {
            alpha: default_fhn_alpha(),
            beta: default_fhn_beta(),
            gamma: default_fhn_gamma(),
            delta: 0.0,
            epsilon: default_fhn_epsilon(),
            tau: default_fhn_tau(),
        }
    }
}

serializable_struct_with_getters! {
    HopfParams {
        #[serde(default = "default_hopf_a")]
        a: f64,
        #[serde(default = "default_hopf_w")]
        w: f64,
    }
}

fn default_hopf_a() -> f64 {
    0.25
}
fn default_hopf_w() -> f64 {
    0.2
}

impl Default for HopfParams {
    fn default() -> Self {
        Self {
            a: default_hopf_a(),
            w: default_hopf_w(),
        }
    }
}

serializable_struct_with_getters! {
    WilsonCowanParams {
        #[serde(default = "default_wc_tau_exc")]
        tau_exc: f64,
        #[serde(default = "default_wc_tau_inh")]
        tau_inh: f64,
        #[serde(default = "default_wc_c_excexc")]
        c_excexc: f64,
        #[serde(default = "default_wc_c_inhexc")]
        c_inhexc: f64,
        #[serde(default = "default_wc_c_excinh")]
        c_excinh: f64,
        #[serde(default = "default_wc_c_inhinh")]
        c_inhinh: f64,
        #[serde(default = "default_wc_slope")]
        a_exc: f64,
        #[serde(default = "default_wc_slope")]
        a_inh: f64,
        #[serde(default = "default_wc_threshold")]
        mu_exc: f64,
        #[serde(default = "default_wc_threshold")]
        mu_inh: f64,
        background: Option<Vec<Vec<Vec<f64>>>>,
    }
}

fn default_wc_tau_exc() -> f64 {
    2.5
}
fn default_wc_tau_inh() -> f64 {
    3.75
}
fn default_wc_c_excexc() -> f64 {
    16.0
}
fn default_wc_c_inhexc() -> f64 {
    12.0
}
fn default_wc_c_excinh() -> f64 {
    15.0
}
fn default_wc_c_inhinh() -> f64 {
    3.0
}
fn default_wc_slope() -> f64 {
    1.5
}
fn default_wc_threshold() -> f64 {
    3.0
}

impl Default for WilsonCowanParams {
    fn default() -> Self {
        Self {
            tau_exc: default_wc_tau_exc(),
            tau_inh: default_wc_tau_inh(),
            c_excexc: default_wc_c_excexc(),
            c_inhexc: default_wc_c_inhexc(),
            c_excinh: default_wc_c_excinh(),
            c_inhinh: default_wc_c_inhinh(),
            a_exc: default_wc_slope(),
            a_inh: default_wc_slope(),
            mu_exc: default_wc_threshold(),
            mu_inh: default_wc_threshold(),
            background: None,
        }
    }
}

serializable_struct_with_getters! {
    LinearParams {
        a: Vec<Vec<f64>>,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ModelConfig {
    Fhn(FhnParams),
    Hopf(HopfParams),
    WilsonCowan(WilsonCowanParams),
    Linear(LinearParams),
}

impl ModelConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ModelConfig::Fhn(_) => "fhn",
            ModelConfig::Hopf(_) => "hopf",
            ModelConfig::WilsonCowan(_) => "wilson_cowan",
            ModelConfig::Linear(_) => "linear",
        }
    }
}
