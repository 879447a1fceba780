//! Test-support library for the qualifier-synthesis pipeline: a
//! `mock_smt` harness that drives the pure pipeline stages without a live
//! solver process, and a `test_util` diffing helper adapted from
//! `chalk-tests`. Consumed by the integration tests under `tests/`.

pub mod mock_smt;
pub mod test_util;
