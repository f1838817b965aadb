//! Action representations and action spaces

use std::fmt::Debug;
use std::marker::PhantomData;

/// Trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {
    /// Convert action to a vector representation
    fn to_vec(&self) -> Vec<f64>;
}

/// Actions drawn from a finite, indexable set
pub trait DiscreteAction: Action + Copy {
    /// Number of distinct actions
    const COUNT: usize;

    /// Index of this action in `0..COUNT`
    fn index(self) -> usize;

    /// Action for an index, `None` when out of range
    fn from_index(index: usize) -> Option<Self>;
}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space
    fn sample(&self) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Number of actions, when the space is finite
    fn n(&self) -> Option<usize>;
}

/// Discrete action space over every value of a [`DiscreteAction`]
#[derive(Debug, Clone, Copy)]
pub struct DiscreteSpace<A> {
    _action: PhantomData<A>,
}

impl<A: DiscreteAction> DiscreteSpace<A> {
    /// Create a new discrete action space
    #[must_use]
    pub fn new() -> Self {
        Self { _action: PhantomData }
    }
}

impl<A: DiscreteAction> Default for DiscreteSpace<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: DiscreteAction> ActionSpace for DiscreteSpace<A> {
    type Action = A;

    fn sample(&self) -> Self::Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        loop {
            if let Some(action) = A::from_index(rng.gen_range(0..A::COUNT)) {
                return action;
            }
        }
    }

    fn contains(&self, action: &Self::Action) -> bool {
        action.index() < A::COUNT
    }

    fn n(&self) -> Option<usize> {
        Some(A::COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Coin {
        Heads,
        Tails,
    }

    impl Action for Coin {
        fn to_vec(&self) -> Vec<f64> {
            vec![self.index() as f64]
        }
    }

    impl DiscreteAction for Coin {
        const COUNT: usize = 2;

        fn index(self) -> usize {
            match self {
                Coin::Heads => 0,
                Coin::Tails => 1,
            }
        }

        fn from_index(index: usize) -> Option<Self> {
            match index {
                0 => Some(Coin::Heads),
                1 => Some(Coin::Tails),
                _ => None,
            }
        }
    }

    #[test]
    fn test_discrete_space_samples_members() {
        let space = DiscreteSpace::<Coin>::new();
        assert_eq!(space.n(), Some(2));
        for _ in 0..32 {
            let action = space.sample();
            assert!(space.contains(&action));
        }
    }
}
