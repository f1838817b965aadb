//! Value functions for RL algorithms

/// Action value function Q(s, a) over a discrete action set
pub trait ActionValueFunction: Send + Sync {
    /// Number of actions the function scores
    fn num_actions(&self) -> usize;

    /// Get Q-values for all actions
    fn q_values(&self, features: &[f32]) -> crate::Result<Vec<f32>>;

    /// Estimate the value of taking one action
    fn q_value(&self, features: &[f32], action: usize) -> crate::Result<f32> {
        let values = self.q_values(features)?;
        values.get(action).copied().ok_or_else(|| {
            crate::RLError::InvalidAction(format!("action index {action} out of {}", values.len()))
        })
    }

    /// Get the best action index and its value
    fn best_action_value(&self, features: &[f32]) -> crate::Result<(usize, f32)> {
        let values = self.q_values(features)?;
        values
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or_else(|| crate::RLError::Computation("empty action set".to_string()))
    }
}
