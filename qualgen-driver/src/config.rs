use std::path::PathBuf;

use qualgen_smt::Backend;

/// Everything the pipeline needs to know beyond the `FInfo` itself: which
/// solver to drive, how deep to unroll, and where to log the dialogue
/// (§4.8 "Driving loop"). Grouped into one struct the way chalk's CLI
/// groups `--overflow-depth`/`--no-cache`/`--solver` into a single `Args`
/// (`chalk-repl/src/main.rs`) rather than threading each flag separately.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub backend: Backend,
    /// Overrides the backend's default executable name (`--solver-path`).
    pub solver_path: Option<String>,
    /// The unroll depth budget handed to every k-variable (§4.2 "Depth
    /// budget").
    pub depth: usize,
    /// Tree depth above which the serializer switches to its explicit-stack
    /// variant (§9 "avoid stack overflow on deep ... trees").
    pub depth_threshold: usize,
    /// Optional `.smt2` transcript path.
    pub log_path: Option<PathBuf>,
}

impl SolverConfig {
    pub fn new(backend: Backend, depth: usize) -> SolverConfig {
        SolverConfig {
            backend,
            solver_path: None,
            depth,
            depth_threshold: 200,
            log_path: None,
        }
    }
}
