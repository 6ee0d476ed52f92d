use rayon::prelude::*;

use crate::constraint::capabilities::Testable;
use crate::kinematic_traits::Configuration;

/// Checks a series of joint configurations (`steps`) against the testable.
/// These checks are done in parallel so should be fast.
///
/// # Parameters
/// - `steps`: configurations to check, normally a discretized trajectory.
/// - `testable`: constraint each of them must satisfy (collisions, joint limits, ...).
///
/// # Returns
/// - `Option<usize>`: The wrapped index of the first configuration that does not satisfy
///            the testable, or None if all of them do. The index is always the lowest
///            failing one, regardless of how the work has been split between threads.
pub fn check_path(
    steps: &[Configuration],
    testable: &dyn Testable,
) -> Option<usize> {
    (0..steps.len())
        .into_par_iter()
        .find_first(|&i| !testable.is_satisfied(&steps[i]))
}
