//! Experience replay

use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

/// One recorded transition
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

/// A sampled minibatch, one row per experience
#[derive(Debug, Clone)]
pub struct Batch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    /// 1.0 for terminal transitions, 0.0 otherwise
    pub dones: Array1<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Fixed-capacity ring buffer of experiences; the oldest is evicted first
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    memory: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.memory.len() == self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Experiences from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.memory.iter()
    }

    /// Draw `batch_size` distinct experiences uniformly at random, or `None`
    /// when the buffer holds fewer than that
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Option<Batch> {
        if batch_size == 0 || self.memory.len() < batch_size {
            return None;
        }
        let picked: Vec<&Experience> = index::sample(rng, self.memory.len(), batch_size)
            .into_iter()
            .map(|i| &self.memory[i])
            .collect();
        Some(stack(&picked))
    }
}

fn stack(experiences: &[&Experience]) -> Batch {
    let rows = experiences.len();
    let width = experiences.first().map_or(0, |e| e.state.len());
    let states = Array2::from_shape_fn((rows, width), |(r, c)| experiences[r].state[c]);
    let next_states = Array2::from_shape_fn((rows, width), |(r, c)| experiences[r].next_state[c]);

    Batch {
        states,
        actions: experiences.iter().map(|e| e.action).collect(),
        rewards: experiences.iter().map(|e| e.reward).collect(),
        next_states,
        dones: experiences
            .iter()
            .map(|e| if e.done { 1.0 } else { 0.0 })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn experience(tag: usize) -> Experience {
        Experience {
            state: vec![tag as f32, 0.0],
            action: tag % 3,
            reward: tag as f32 * 0.5,
            next_state: vec![tag as f32 + 1.0, 1.0],
            done: tag % 2 == 0,
        }
    }

    #[test]
    fn test_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(3);
        for tag in 0..4 {
            buffer.push(experience(tag));
            assert!(buffer.len() <= buffer.capacity());
        }
        assert_eq!(buffer.len(), 3);
        let tags: Vec<usize> = buffer.iter().map(|e| e.state[0] as usize).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_sample_requires_full_batch() {
        let mut buffer = ReplayBuffer::new(10);
        let mut rng = Pcg64::seed_from_u64(0);
        for tag in 0..3 {
            buffer.push(experience(tag));
        }
        assert!(buffer.sample(4, &mut rng).is_none());
        assert!(buffer.sample(0, &mut rng).is_none());
        assert_eq!(buffer.sample(3, &mut rng).unwrap().len(), 3);
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut buffer = ReplayBuffer::new(100);
        let mut rng = Pcg64::seed_from_u64(1);
        for tag in 0..20 {
            buffer.push(experience(tag));
        }
        let batch = buffer.sample(20, &mut rng).unwrap();
        let mut tags: Vec<usize> = batch.states.column(0).iter().map(|v| *v as usize).collect();
        tags.sort_unstable();
        assert_eq!(tags, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_rows_line_up() {
        let mut buffer = ReplayBuffer::new(8);
        let mut rng = Pcg64::seed_from_u64(2);
        for tag in 0..8 {
            buffer.push(experience(tag));
        }
        let batch = buffer.sample(5, &mut rng).unwrap();
        assert_eq!(batch.states.dim(), (5, 2));
        for row in 0..batch.len() {
            let tag = batch.states[[row, 0]] as usize;
            assert_eq!(batch.actions[row], tag % 3);
            assert_eq!(batch.rewards[row], tag as f32 * 0.5);
            assert_eq!(batch.next_states[[row, 0]], tag as f32 + 1.0);
            assert_eq!(batch.dones[row], if tag % 2 == 0 { 1.0 } else { 0.0 });
        }
    }
}
