//! Two-layer Q-network with manual backpropagation and Adam
//!
//! Pure ndarray implementation: `input -> hidden (ReLU) -> actions`.

use ndarray::{Array, Array1, Array2, ArrayView1, Axis, Dimension, Zip};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use maze_rl_core::{ActionValueFunction, RLError, Result};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;

/// First and second moment estimates for one parameter tensor
#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    m: Array<f32, D>,
    v: Array<f32, D>,
}

impl<D: Dimension> Moments<D> {
    fn like(param: &Array<f32, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }

    fn step(&mut self, param: &mut Array<f32, D>, grad: &Array<f32, D>, lr: f32, t: i32) {
        let m_correction = 1.0 - BETA1.powi(t);
        let v_correction = 1.0 - BETA2.powi(t);
        Zip::from(param)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|p, m, v, &g| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                let m_hat = *m / m_correction;
                let v_hat = *v / v_correction;
                *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
            });
    }
}

#[derive(Debug, Clone)]
struct Adam {
    learning_rate: f32,
    t: i32,
    w1: Moments<ndarray::Ix2>,
    b1: Moments<ndarray::Ix1>,
    w2: Moments<ndarray::Ix2>,
    b2: Moments<ndarray::Ix1>,
}

/// Intermediate values of a forward pass, kept for backpropagation
struct Activations {
    pre_hidden: Array1<f32>,
    hidden: Array1<f32>,
    output: Array1<f32>,
}

/// Multi-layer perceptron estimating one Q-value per action
#[derive(Debug, Clone)]
pub struct QNetwork {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
    optimizer: Adam,
}

impl QNetwork {
    /// Xavier-uniform weights, zero biases
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Self {
        let w1 = xavier_uniform(input_dim, hidden_dim, rng);
        let b1 = Array1::zeros(hidden_dim);
        let w2 = xavier_uniform(hidden_dim, output_dim, rng);
        let b2 = Array1::zeros(output_dim);

        #[allow(clippy::cast_possible_truncation)]
        let optimizer = Adam {
            learning_rate: learning_rate as f32,
            t: 0,
            w1: Moments::like(&w1),
            b1: Moments::like(&b1),
            w2: Moments::like(&w2),
            b2: Moments::like(&b2),
        };

        Self {
            w1,
            b1,
            w2,
            b2,
            optimizer,
        }
    }

    /// Observation length
    #[must_use]
    pub fn input_dim(&self) -> usize {
        self.w1.nrows()
    }

    /// Hidden layer width
    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.w1.ncols()
    }

    /// Number of actions
    #[must_use]
    pub fn output_dim(&self) -> usize {
        self.w2.ncols()
    }

    /// Total number of weights and biases
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }

    fn check_input(&self, features: &[f32]) -> Result<()> {
        if features.len() == self.input_dim() {
            Ok(())
        } else {
            Err(RLError::DimensionMismatch {
                expected: self.input_dim(),
                actual: features.len(),
            })
        }
    }

    fn forward(&self, input: ArrayView1<'_, f32>) -> Activations {
        let pre_hidden = input.dot(&self.w1) + &self.b1;
        let hidden = pre_hidden.mapv(|v| v.max(0.0));
        let output = hidden.dot(&self.w2) + &self.b2;
        Activations {
            pre_hidden,
            hidden,
            output,
        }
    }

    /// One Adam step on the squared error of a single action's Q-value.
    /// Returns the loss before the update.
    pub fn train_step(&mut self, features: &[f32], action: usize, target: f32) -> Result<f32> {
        self.check_input(features)?;
        if action >= self.output_dim() {
            return Err(RLError::InvalidAction(format!(
                "action index {action} out of {}",
                self.output_dim()
            )));
        }

        let input = ArrayView1::from(features);
        let acts = self.forward(input);
        let error = acts.output[action] - target;
        let loss = error * error;

        let mut grad_output = Array1::<f32>::zeros(self.output_dim());
        grad_output[action] = 2.0 * error;

        let grad_w2 = outer(&acts.hidden.view(), &grad_output.view());
        let grad_hidden = self.w2.dot(&grad_output);
        let grad_pre_hidden = Zip::from(&grad_hidden)
            .and(&acts.pre_hidden)
            .map_collect(|&g, &z| if z > 0.0 { g } else { 0.0 });
        let grad_w1 = outer(&input, &grad_pre_hidden.view());

        let opt = &mut self.optimizer;
        opt.t = opt.t.saturating_add(1);
        let (lr, t) = (opt.learning_rate, opt.t);
        opt.w1.step(&mut self.w1, &grad_w1, lr, t);
        opt.b1.step(&mut self.b1, &grad_pre_hidden, lr, t);
        opt.w2.step(&mut self.w2, &grad_w2, lr, t);
        opt.b2.step(&mut self.b2, &grad_output, lr, t);

        Ok(loss)
    }

    /// Flattened parameters: `w1, b1, w2, b2`, row-major
    #[must_use]
    pub fn parameters(&self) -> Vec<f32> {
        let mut params = Vec::with_capacity(self.parameter_count());
        params.extend(self.w1.iter());
        params.extend(self.b1.iter());
        params.extend(self.w2.iter());
        params.extend(self.b2.iter());
        params
    }

    /// Overwrite all parameters from a flat vector in [`QNetwork::parameters`] order
    pub fn set_parameters(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.parameter_count() {
            return Err(RLError::DimensionMismatch {
                expected: self.parameter_count(),
                actual: params.len(),
            });
        }

        let slots = self
            .w1
            .iter_mut()
            .chain(self.b1.iter_mut())
            .chain(self.w2.iter_mut())
            .chain(self.b2.iter_mut());
        for (slot, &value) in slots.zip(params) {
            *slot = value;
        }
        Ok(())
    }

    /// Copy weights and biases from another network of the same shape,
    /// leaving this network's optimizer state alone
    pub fn copy_weights_from(&mut self, other: &QNetwork) -> Result<()> {
        self.set_parameters(&other.parameters())
    }
}

impl ActionValueFunction for QNetwork {
    fn num_actions(&self) -> usize {
        self.output_dim()
    }

    fn q_values(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.check_input(features)?;
        Ok(self.forward(ArrayView1::from(features)).output.to_vec())
    }
}

#[allow(clippy::cast_precision_loss)]
fn xavier_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Array2<f32> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((fan_in, fan_out), |_| dist.sample(rng))
}

fn outer(a: &ArrayView1<'_, f32>, b: &ArrayView1<'_, f32>) -> Array2<f32> {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    column.dot(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network(seed: u64) -> QNetwork {
        QNetwork::new(9, 16, 4, 1e-2, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_shapes_and_initial_biases() {
        let net = network(0);
        assert_eq!((net.input_dim(), net.hidden_dim(), net.output_dim()), (9, 16, 4));
        assert_eq!(net.parameter_count(), 9 * 16 + 16 + 16 * 4 + 4);
        assert!(net.b1.iter().chain(net.b2.iter()).all(|&b| b == 0.0));

        let limit = (6.0f32 / 25.0).sqrt();
        assert!(net.w1.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_rejects_wrong_input_size() {
        let net = network(0);
        let err = net.q_values(&[0.0; 4]).unwrap_err();
        assert!(matches!(err, RLError::DimensionMismatch { expected: 9, actual: 4 }));
    }

    #[test]
    fn test_training_moves_value_towards_target() {
        let mut net = network(1);
        let features = [1.0, 0.0, 1.0, 0.0, 2.0, 0.0, 1.0, 3.0, 1.0];
        let first = net.train_step(&features, 2, 5.0).unwrap();
        let mut last = first;
        for _ in 0..500 {
            last = net.train_step(&features, 2, 5.0).unwrap();
        }
        assert!(last < first * 0.05, "loss {first} -> {last}");
        assert_relative_eq!(net.q_value(&features, 2).unwrap(), 5.0, epsilon = 0.25);
    }

    #[test]
    fn test_parameter_round_trip() {
        let source = network(2);
        let mut copy = network(3);
        assert_ne!(source.parameters(), copy.parameters());

        copy.copy_weights_from(&source).unwrap();
        assert_eq!(source.parameters(), copy.parameters());

        let features = [0.5; 9];
        assert_eq!(source.q_values(&features).unwrap(), copy.q_values(&features).unwrap());
        assert!(copy.set_parameters(&[0.0; 3]).is_err());
    }
}
