//! Action-value network
//!
//! A three-layer perceptron: `state -> ReLU(hidden0) -> ReLU(hidden1) ->
//! action values`. Weights are stored `(inputs, outputs)` so a batch of row
//! vectors is evaluated as `x.dot(W) + b`.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// One fully connected layer
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Linear {
    /// Uniform init in `[-1/sqrt(inputs), 1/sqrt(inputs)]`
    fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        Self {
            weight: Array2::from_shape_simple_fn((inputs, outputs), || dist.sample(rng)),
            bias: Array1::from_shape_simple_fn(outputs, || dist.sample(rng)),
        }
    }

    fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight) + &self.bias
    }

    fn soft_update_from(&mut self, local: &Linear, tau: f32) {
        Zip::from(&mut self.weight)
            .and(&local.weight)
            .for_each(|t, &l| *t = tau * l + (1.0 - tau) * *t);
        Zip::from(&mut self.bias)
            .and(&local.bias)
            .for_each(|t, &l| *t = tau * l + (1.0 - tau) * *t);
    }
}

/// Gradient of a loss with respect to one layer
#[derive(Debug, Clone)]
pub struct LinearGrad {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

/// Gradients for every layer, in layer order
#[derive(Debug, Clone)]
pub struct Gradients {
    pub layers: Vec<LinearGrad>,
}

/// Activations kept from a training forward pass
#[derive(Debug, Clone)]
pub struct ForwardCache {
    /// Input of each layer; entry 0 is the batch itself
    inputs: Vec<Array2<f32>>,
    /// Action values, one row per batch entry
    pub output: Array2<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QNetwork {
    layers: Vec<Linear>,
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        action_size: usize,
        hidden_units: [usize; 2],
        rng: &mut R,
    ) -> Self {
        let [fc1, fc2] = hidden_units;
        Self {
            layers: vec![
                Linear::new(state_size, fc1, rng),
                Linear::new(fc1, fc2, rng),
                Linear::new(fc2, action_size, rng),
            ],
        }
    }

    pub fn state_size(&self) -> usize {
        self.layers[0].weight.nrows()
    }

    pub fn action_size(&self) -> usize {
        self.layers[self.layers.len() - 1].weight.ncols()
    }

    pub fn layers(&self) -> &[Linear] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Linear] {
        &mut self.layers
    }

    /// Action values for a batch of states, without keeping activations
    pub fn forward(&self, states: &Array2<f32>) -> Array2<f32> {
        let last = self.layers.len() - 1;
        let mut x = states.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            if i < last {
                x.mapv_inplace(relu);
            }
        }
        x
    }

    /// Action values for a single state
    pub fn predict(&self, state: &[f32]) -> Array1<f32> {
        let input = Array2::from_shape_fn((1, state.len()), |(_, c)| state[c]);
        self.forward(&input).index_axis_move(Axis(0), 0)
    }

    /// Forward pass that keeps what [`QNetwork::backward`] needs
    pub fn forward_cached(&self, states: &Array2<f32>) -> ForwardCache {
        let last = self.layers.len() - 1;
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut x = states.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&x);
            inputs.push(x);
            x = if i < last { z.mapv(relu) } else { z };
        }
        ForwardCache { inputs, output: x }
    }

    /// Back-propagate `grad_output` (dLoss/dOutput) through the network
    pub fn backward(&self, cache: &ForwardCache, grad_output: &Array2<f32>) -> Gradients {
        let mut delta = grad_output.clone();
        let mut layers = Vec::with_capacity(self.layers.len());

        for (l, layer) in self.layers.iter().enumerate().rev() {
            let input = &cache.inputs[l];
            let weight = input.t().dot(&delta);
            let bias = delta.sum_axis(Axis(0));
            if l > 0 {
                // input of layer l is ReLU output of layer l-1
                let mut upstream = delta.dot(&layer.weight.t());
                Zip::from(&mut upstream).and(input).for_each(|d, &a| {
                    if a <= 0.0 {
                        *d = 0.0;
                    }
                });
                delta = upstream;
            }
            layers.push(LinearGrad { weight, bias });
        }

        layers.reverse();
        Gradients { layers }
    }

    /// Polyak averaging: `self <- tau * local + (1 - tau) * self`
    pub fn soft_update_from(&mut self, local: &QNetwork, tau: f32) {
        for (target, source) in self.layers.iter_mut().zip(&local.layers) {
            target.soft_update_from(source, tau);
        }
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// Index of the largest value; the lowest index wins ties
pub fn argmax(values: &Array1<f32>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
