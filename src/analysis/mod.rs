/// Reading derivation for the air-quality monitor.
///
/// Submodules:
/// - `sampling`: picks the current hour out of a fetched series and runs the
///   per-fetch step (classify, compare, advance history).
/// - `history`: classified readings and the previous/current pair.

pub mod history;
pub mod sampling;
