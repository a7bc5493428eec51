//! Pairing of requested variables with a network's inputs and outputs.
//!
//! Inputs are matched strictly: every network input must be supplied by the
//! requester, otherwise the network cannot be evaluated at all. Outputs are
//! matched permissively: a network qualifies as soon as it produces one of
//! the requested outputs, so a dispatcher can combine several networks that
//! each cover part of a larger output set.
//!
//! # Example
//!
//! ```rust
//! use mlpeval::match_variables;
//!
//! let result = match_variables(&["u", "v"], &["y", "z"], &["w", "v", "u"], &["y"]);
//! assert!(result.is_match);
//! assert_eq!(result.input_indices, vec![(2, 0), (1, 1)]);
//! assert_eq!(result.output_indices, vec![(0, 0)]);
//! ```

use std::collections::HashMap;

/// Outcome of matching a request against one network.
///
/// Pairs are `(requester index, network index)`, ordered by network index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// The network can answer the request.
    pub is_match: bool,
    /// One pair per network input when matched.
    pub input_indices: Vec<(usize, usize)>,
    /// One pair per network output that was requested.
    pub output_indices: Vec<(usize, usize)>,
}

impl MatchResult {
    /// A result with no pairs.
    pub fn no_match() -> Self {
        Self::default()
    }

    /// Requester-side indices of the outputs this network provides.
    pub fn covered_outputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.output_indices.iter().map(|&(lookup, _)| lookup)
    }
}

/// Index of every name; a repeated name maps to its last position.
fn index_names<L: AsRef<str>>(names: &[L]) -> HashMap<&str, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_ref(), i))
        .collect()
}

/// Matches a network's variable names against a requester's lists.
///
/// Returns a populated [`MatchResult`] only when every network input is found
/// in `lookup_inputs` and at least one network output in `lookup_outputs`;
/// otherwise `is_match` is false and both pair lists are empty.
pub fn match_variables<N, L>(
    network_inputs: &[N],
    network_outputs: &[N],
    lookup_inputs: &[L],
    lookup_outputs: &[L],
) -> MatchResult
where
    N: AsRef<str>,
    L: AsRef<str>,
{
    if network_inputs.len() > lookup_inputs.len() {
        log::debug!(
            "request supplies {} inputs, network needs {}",
            lookup_inputs.len(),
            network_inputs.len()
        );
        return MatchResult::no_match();
    }

    let available = index_names(lookup_inputs);
    let mut input_indices = Vec::with_capacity(network_inputs.len());
    for (i, name) in network_inputs.iter().enumerate() {
        match available.get(name.as_ref()) {
            Some(&lookup) => input_indices.push((lookup, i)),
            None => {
                log::debug!("network input '{}' not supplied", name.as_ref());
                return MatchResult::no_match();
            }
        }
    }

    let requested = index_names(lookup_outputs);
    let output_indices: Vec<(usize, usize)> = network_outputs
        .iter()
        .enumerate()
        .filter_map(|(i, name)| requested.get(name.as_ref()).map(|&lookup| (lookup, i)))
        .collect();
    if output_indices.is_empty() {
        return MatchResult::no_match();
    }

    MatchResult {
        is_match: true,
        input_indices,
        output_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_lookup_inputs_allowed() {
        let result = match_variables(&["u", "v"], &["y", "z"], &["u", "v", "w"], &["y"]);
        assert!(result.is_match);
        assert_eq!(result.input_indices, vec![(0, 0), (1, 1)]);
        assert_eq!(result.output_indices, vec![(0, 0)]);
    }

    #[test]
    fn test_missing_input_rejects() {
        let result = match_variables(&["u", "v"], &["y"], &["u", "x"], &["y"]);
        assert_eq!(result, MatchResult::no_match());
    }

    #[test]
    fn test_no_common_output_rejects() {
        let result = match_variables(&["u"], &["y"], &["u"], &["z"]);
        assert!(!result.is_match);
        assert!(result.input_indices.is_empty());
        assert!(result.output_indices.is_empty());
    }

    #[test]
    fn test_repeated_lookup_name_uses_last() {
        let result = match_variables(&["u"], &["y"], &["u", "u"], &["y"]);
        assert_eq!(result.input_indices, vec![(1, 0)]);
    }

    #[test]
    fn test_covered_outputs() {
        let result = match_variables(&["u"], &["a", "b", "c"], &["u"], &["c", "x", "a"]);
        assert_eq!(result.covered_outputs().collect::<Vec<_>>(), vec![2, 0]);
    }
}
