use std::str::FromStr;

use qualgen_ir::QError;

/// Which interpolating SMT solver to drive, and the command-line/protocol
/// quirks needed to talk to it (§4.5 "Backend selection"). Mirrors the way
/// chalk's CLI lets the caller pick a solver strategy by name
/// (`chalk-repl/src/main.rs`'s `--solver`/`SolverChoice`) rather than
/// hardwiring one implementation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Backend {
    /// MathSAT5, invoked with `-interpolation=true`.
    MathSat,
    /// Z3 built with its (now-removed) interpolation extension. Z3 changed
    /// the option name controlling model generation across the 4.3.2
    /// release; `Z3Version` records which side of that line we're on so
    /// `preamble` can emit the right option.
    Z3(Z3Version),
    /// CVC4/CVC5 via `--produce-interpolants`.
    Cvc4,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Z3Version {
    Pre432,
    Post432,
}

impl Backend {
    /// The argv used to launch this backend in interactive (stdin/stdout
    /// pipe) mode.
    pub fn command_line(self) -> Vec<&'static str> {
        match self {
            Backend::MathSat => vec!["mathsat", "-interpolation=true"],
            Backend::Z3(_) => vec!["z3", "-in", "-smt2"],
            Backend::Cvc4 => vec!["cvc4", "--lang=smt2", "--interactive", "--produce-interpolants"],
        }
    }

    /// The preamble options asserted before any `declare-fun` (§4.5 step
    /// 1): enables model production and, where the backend supports it,
    /// disables quantifier instantiation heuristics that would otherwise
    /// make interpolants non-deterministic across runs.
    pub fn preamble(self) -> Vec<String> {
        match self {
            Backend::MathSat => vec![
                "(set-option :produce-models true)".to_string(),
                "(set-option :produce-interpolants true)".to_string(),
            ],
            Backend::Z3(Z3Version::Pre432) => vec!["(set-option :model true)".to_string()],
            Backend::Z3(Z3Version::Post432) => vec!["(set-option :produce-models true)".to_string()],
            Backend::Cvc4 => vec![
                "(set-option :produce-models true)".to_string(),
                "(set-option :incremental true)".to_string(),
            ],
        }
    }

    /// The command used to request a tree interpolant for the cut points
    /// asserted so far (§4.5 step 4). MathSAT and CVC4 use
    /// `(get-interpolants)`; Z3's extension used `(get-interpolant)`
    /// (singular) in older builds.
    pub fn interpolant_command(self) -> &'static str {
        match self {
            Backend::MathSat | Backend::Cvc4 => "(get-interpolants)",
            Backend::Z3(Z3Version::Pre432) => "(get-interpolant)",
            Backend::Z3(Z3Version::Post432) => "(get-interpolants)",
        }
    }
}

impl FromStr for Backend {
    type Err = QError;

    fn from_str(s: &str) -> Result<Backend, QError> {
        match s {
            "mathsat" => Ok(Backend::MathSat),
            "z3" => Ok(Backend::Z3(Z3Version::Post432)),
            "z3-legacy" => Ok(Backend::Z3(Z3Version::Pre432)),
            "cvc4" => Ok(Backend::Cvc4),
            other => Err(QError::InputError {
                location: "--solver".to_string(),
                message: format!("unknown solver backend `{}` (expected mathsat, z3, z3-legacy, or cvc4)", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_backend_names() {
        assert_eq!("mathsat".parse::<Backend>().unwrap(), Backend::MathSat);
        assert_eq!("z3".parse::<Backend>().unwrap(), Backend::Z3(Z3Version::Post432));
    }

    #[test]
    fn unknown_backend_name_is_an_input_error() {
        assert!("souffle".parse::<Backend>().is_err());
    }

    #[test]
    fn z3_versions_disagree_on_interpolant_command() {
        assert_ne!(
            Backend::Z3(Z3Version::Pre432).interpolant_command(),
            Backend::Z3(Z3Version::Post432).interpolant_command()
        );
    }
}
