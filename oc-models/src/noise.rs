use anyhow::{anyhow, Result};
use ndarray::Array2;
use oc_structs::config::NoiseConfig;
use rand::{distributions::Distribution, rngs::StdRng, SeedableRng};
use rand_distr::Normal;

/// Ornstein-Uhlenbeck process per node and state variable.
///
/// The generator is seeded once, so consecutive simulations draw different but
/// reproducible realizations.
#[derive(Debug, Clone)]
pub struct OrnsteinUhlenbeck {
    sigma: f64,
    tau: f64,
    mean: f64,
    rng: StdRng,
    normal: Normal<f64>,
    state: Array2<f64>,
}

impl OrnsteinUhlenbeck {
    pub fn new(config: &NoiseConfig, n_nodes: usize, n_vars: usize) -> Result<Self> {
        if !(config.sigma_ou >= 0.0) {
            return Err(anyhow!("sigma_ou must not be negative, got {}", config.sigma_ou));
        }
        if !(config.tau_ou > 0.0) {
            return Err(anyhow!("tau_ou must be positive, got {}", config.tau_ou));
        }
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| anyhow!("Failed to create normal distribution: {}", e))?;
        Ok(Self {
            sigma: config.sigma_ou,
            tau: config.tau_ou,
            mean: config.mean,
            rng: StdRng::seed_from_u64(config.seed),
            normal,
            state: Array2::from_elem((n_nodes, n_vars), config.mean),
        })
    }

    pub fn is_active(&self) -> bool {
        self.sigma > 0.0
    }

    pub fn state(&self) -> &Array2<f64> {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.fill(self.mean);
    }

    /// One Euler-Maruyama step of length `dt`.
    pub fn advance(&mut self, dt: f64) {
        if !self.is_active() {
            return;
        }
        let diffusion = self.sigma * dt.sqrt();
        let (mean, tau) = (self.mean, self.tau);
        for ou in self.state.iter_mut() {
            *ou += (mean - *ou) * dt / tau + diffusion * self.normal.sample(&mut self.rng);
        }
    }
}
