use anyhow::{anyhow, Result};
use ndarray::{Array2, Array5, ArrayView1};
use oc_structs::config::{Coupling, NetworkConfig};
use oc_utils::to_array2;

/// Structural connectivity acting on the first state variable of every node.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    cmat: Array2<f64>,
    k_gl: f64,
    coupling: Coupling,
}

impl Network {
    pub fn new(cmat: Array2<f64>, k_gl: f64, coupling: Coupling) -> Result<Self> {
        let n_nodes = cmat.nrows();
        if n_nodes == 0 || cmat.ncols() != n_nodes {
            return Err(anyhow!(
                "Coupling matrix must be square and non-empty, got {:?}",
                cmat.shape()
            ));
        }
        if n_nodes > 1 && (0..n_nodes).any(|n| cmat[[n, n]] != 0.0) {
            return Err(anyhow!("Coupling matrix must have a zero diagonal"));
        }
        if cmat.iter().any(|c| !c.is_finite()) || !k_gl.is_finite() {
            return Err(anyhow!("Coupling strengths must be finite"));
        }
        Ok(Self {
            cmat,
            k_gl,
            coupling,
        })
    }

    /// Single node without coupling.
    pub fn single_node() -> Self {
        Self {
            cmat: Array2::zeros((1, 1)),
            k_gl: 0.0,
            coupling: Coupling::Additive,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::new(to_array2(&config.cmat)?, config.k_gl, config.coupling)
    }

    pub fn n_nodes(&self) -> usize {
        self.cmat.nrows()
    }

    pub fn cmat(&self) -> &Array2<f64> {
        &self.cmat
    }

    pub fn k_gl(&self) -> f64 {
        self.k_gl
    }

    pub fn coupling(&self) -> Coupling {
        self.coupling
    }

    /// Input received by node `n` given the coupled variable of all nodes.
    pub fn input(&self, coupled: ArrayView1<f64>, n: usize) -> f64 {
        let row = self.cmat.row(n);
        let sum = match self.coupling {
            Coupling::Additive => row.dot(&coupled),
            Coupling::Diffusive => row
                .iter()
                .zip(coupled.iter())
                .map(|(c, x_l)| c * (x_l - coupled[n]))
                .sum(),
        };
        self.k_gl * sum
    }

    /// Coupling Jacobian `N x N x T x V x V` in the `-df/dx` convention.
    ///
    /// `sensitivity[[n, t]]` is the derivative of node `n`'s coupled variable
    /// w.r.t. its network input at time `t`.
    pub fn jacobian(&self, sensitivity: &Array2<f64>, n_vars: usize) -> Array5<f64> {
        let (n_nodes, n_steps) = sensitivity.dim();
        let mut hx_nw = Array5::zeros((n_nodes, n_nodes, n_steps, n_vars, n_vars));
        for n1 in 0..n_nodes {
            let row_sum: f64 = self.cmat.row(n1).sum();
            for n2 in 0..n_nodes {
                let mut weight = -self.k_gl * self.cmat[[n1, n2]];
                if n1 == n2 && self.coupling == Coupling::Diffusive {
                    weight += self.k_gl * row_sum;
                }
                if weight == 0.0 {
                    continue;
                }
                for t in 0..n_steps {
                    hx_nw[[n1, n2, t, 0, 0]] = weight * sensitivity[[n1, t]];
                }
            }
        }
        hx_nw
    }
}
