//! Hidden Markov model instances for the sequential topology.

use num_traits::Float;

use crate::error::{InstanceError, SrfResult};

/// One observation in a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Observation {
    /// Index into the model's emission alphabet.
    Symbol(usize),
    /// Unknown symbol; emits with weight 1 from every state.
    Missing,
}

impl Observation {
    /// First symbol of the reference alphabet (`A`).
    pub const WALK: Observation = Observation::Symbol(0);
    /// Second symbol of the reference alphabet (`C`).
    pub const SHOP: Observation = Observation::Symbol(1);
    /// Third symbol of the reference alphabet (`G`).
    pub const CLEAN: Observation = Observation::Symbol(2);

    /// Maps a nucleotide character: `A→0`, `C→1`, `G→2`, anything else missing.
    pub fn from_base(base: char) -> Self {
        match base {
            'A' => Observation::WALK,
            'C' => Observation::SHOP,
            'G' => Observation::CLEAN,
            _ => Observation::Missing,
        }
    }
}

/// Maps every character of `token` through [`Observation::from_base`].
pub fn parse_observations(token: &str) -> Vec<Observation> {
    token.chars().map(Observation::from_base).collect()
}

/// Discrete-emission hidden Markov model.
///
/// # Example
///
/// ```rust
/// use srf_core::problem::{HiddenMarkovModel, Observation};
///
/// let model = HiddenMarkovModel::weather();
/// assert_eq!(model.n_states(), 2);
/// assert_eq!(model.n_symbols(), 3);
/// assert_eq!(model.emission_weight(1, Observation::WALK), 0.6);
/// assert_eq!(model.emission_weight(1, Observation::Missing), 1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HiddenMarkovModel<T> {
    start: Vec<T>,
    transition: Vec<Vec<T>>,
    emission: Vec<Vec<T>>,
    /// `transition_cols[s][i] = transition[i][s]`
    transition_cols: Vec<Vec<T>>,
}

impl<T: Float> HiddenMarkovModel<T> {
    /// Creates a model from start weights, an `n×n` transition matrix and
    /// an `n×m` emission matrix.
    ///
    /// # Errors
    ///
    /// Returns `InstanceError::ShapeMismatch` if the matrices disagree with
    /// the number of states, if there are no states or no symbols.
    pub fn new(start: Vec<T>, transition: Vec<Vec<T>>, emission: Vec<Vec<T>>) -> SrfResult<Self> {
        let n = start.len();
        if n == 0 {
            return Err(InstanceError::ShapeMismatch {
                field: "start",
                expected: 1,
                found: 0,
            }
            .into());
        }
        if transition.len() != n {
            return Err(InstanceError::ShapeMismatch {
                field: "transition",
                expected: n,
                found: transition.len(),
            }
            .into());
        }
        if let Some(row) = transition.iter().find(|row| row.len() != n) {
            return Err(InstanceError::ShapeMismatch {
                field: "transition row",
                expected: n,
                found: row.len(),
            }
            .into());
        }
        if emission.len() != n {
            return Err(InstanceError::ShapeMismatch {
                field: "emission",
                expected: n,
                found: emission.len(),
            }
            .into());
        }
        let m = emission[0].len();
        if m == 0 {
            return Err(InstanceError::ShapeMismatch {
                field: "emission row",
                expected: 1,
                found: 0,
            }
            .into());
        }
        if let Some(row) = emission.iter().find(|row| row.len() != m) {
            return Err(InstanceError::ShapeMismatch {
                field: "emission row",
                expected: m,
                found: row.len(),
            }
            .into());
        }

        let transition_cols = (0..n)
            .map(|s| transition.iter().map(|row| row[s]).collect())
            .collect();

        Ok(Self {
            start,
            transition,
            emission,
            transition_cols,
        })
    }

    /// Number of hidden states (DP lanes).
    #[inline]
    pub fn n_states(&self) -> usize {
        self.start.len()
    }

    /// Number of emission symbols.
    #[inline]
    pub fn n_symbols(&self) -> usize {
        self.emission[0].len()
    }

    /// Start weight of `state`.
    #[inline]
    pub fn start_weight(&self, state: usize) -> T {
        self.start[state]
    }

    /// Transition weights into `to` from every state.
    #[inline]
    pub fn transition_col(&self, to: usize) -> &[T] {
        &self.transition_cols[to]
    }

    /// Emission weight of `obs` in `state`.
    #[inline]
    pub fn emission_weight(&self, state: usize, obs: Observation) -> T {
        match obs {
            Observation::Symbol(symbol) => self.emission[state][symbol],
            Observation::Missing => T::one(),
        }
    }

    /// Checks that a sequence can be evaluated under this model.
    ///
    /// # Errors
    ///
    /// - `InstanceError::EmptySequence` for an empty sequence
    /// - `InstanceError::SymbolOutOfRange` for a symbol beyond the alphabet
    pub fn validate_observations(&self, observations: &[Observation]) -> SrfResult<()> {
        if observations.is_empty() {
            return Err(InstanceError::EmptySequence.into());
        }
        let alphabet = self.n_symbols();
        for (step, obs) in observations.iter().enumerate() {
            if let Observation::Symbol(symbol) = *obs {
                if symbol >= alphabet {
                    return Err(InstanceError::SymbolOutOfRange {
                        step,
                        symbol,
                        alphabet,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

impl HiddenMarkovModel<f64> {
    /// Two-state weather model (Rainy, Sunny) over three activities
    /// (Walk, Shop, Clean).
    pub fn weather() -> Self {
        Self {
            start: vec![0.6, 0.4],
            transition: vec![vec![0.7, 0.3], vec![0.4, 0.6]],
            emission: vec![vec![0.1, 0.4, 0.5], vec![0.6, 0.3, 0.1]],
            transition_cols: vec![vec![0.7, 0.4], vec![0.3, 0.6]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base() {
        assert_eq!(Observation::from_base('A'), Observation::WALK);
        assert_eq!(Observation::from_base('C'), Observation::SHOP);
        assert_eq!(Observation::from_base('G'), Observation::CLEAN);
        assert_eq!(Observation::from_base('T'), Observation::Missing);
        assert_eq!(Observation::from_base('a'), Observation::Missing);
    }

    #[test]
    fn test_parse_observations() {
        let obs = parse_observations("ACGT");
        assert_eq!(
            obs,
            vec![
                Observation::WALK,
                Observation::SHOP,
                Observation::CLEAN,
                Observation::Missing
            ]
        );
    }

    #[test]
    fn test_weather_matches_new() {
        let built = HiddenMarkovModel::new(
            vec![0.6, 0.4],
            vec![vec![0.7, 0.3], vec![0.4, 0.6]],
            vec![vec![0.1, 0.4, 0.5], vec![0.6, 0.3, 0.1]],
        )
        .unwrap();
        assert_eq!(built, HiddenMarkovModel::weather());
    }

    #[test]
    fn test_transition_col() {
        let model = HiddenMarkovModel::weather();
        assert_eq!(model.transition_col(0), &[0.7, 0.4]);
        assert_eq!(model.transition_col(1), &[0.3, 0.6]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = HiddenMarkovModel::new(
            vec![0.5, 0.5],
            vec![vec![1.0, 0.0]],
            vec![vec![1.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(err.is_rejection());

        let err = HiddenMarkovModel::<f64>::new(vec![], vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_ragged_emission_rejected() {
        let err = HiddenMarkovModel::new(
            vec![0.5, 0.5],
            vec![vec![0.5, 0.5], vec![0.5, 0.5]],
            vec![vec![0.5, 0.5], vec![1.0]],
        )
        .unwrap_err();
        assert!(err.to_string().contains("emission row"));
    }

    #[test]
    fn test_validate_observations() {
        let model = HiddenMarkovModel::weather();
        assert!(model.validate_observations(&[]).is_err());
        assert!(model
            .validate_observations(&[Observation::WALK, Observation::Missing])
            .is_ok());
        let err = model
            .validate_observations(&[Observation::WALK, Observation::Symbol(3)])
            .unwrap_err();
        assert!(err.to_string().contains("step 1"));
    }
}
