use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::instrument;

use qualgen_ir::{QError, QResult};

use crate::backend::Backend;
use crate::log::DialogueLog;
use crate::sexpr::{self, SExpr};

/// The dialogue states a solver session moves through for one query
/// (§4.5/§4.8). Declarations happen once per session; assert/push/pop
/// bracket each query; `WaitingInterp` is entered only after an `unsat`
/// check-sat result (a `sat` or `unknown` top-level result is itself a
/// protocol error — see `SolverSession::check_and_interpolate`).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DialogueState {
    Idle,
    Declaring,
    Asserting,
    WaitingSat,
    WaitingInterp,
}

/// A live solver subprocess, piped the way the lakeroad-to-Racket bridge
/// pipes its own external process (`other_examples/...rust-src-language.rs.rs`'s
/// `call_racket`): `Stdio::piped()` on all three standard streams, a
/// persistent child rather than one spawn per query, since this pipeline
/// issues many small incremental commands per run instead of one shot.
pub struct SolverSession {
    backend: Backend,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    state: DialogueState,
    log: DialogueLog,
}

impl SolverSession {
    #[instrument(skip(log))]
    pub fn spawn(backend: Backend, solver_path: Option<&str>, mut log: DialogueLog) -> QResult<SolverSession> {
        let argv = backend.command_line();
        let program = solver_path.unwrap_or(argv[0]);
        let mut cmd = Command::new(program);
        cmd.args(&argv[1..]);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| QError::SmtProcessError {
            message: format!("failed to spawn `{}`: {}", program, e),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| QError::SmtProcessError {
            message: "solver process has no stdin pipe".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| QError::SmtProcessError {
            message: "solver process has no stdout pipe".to_string(),
        })?;

        let mut session = SolverSession {
            backend,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            state: DialogueState::Idle,
            log,
        };

        for line in backend.preamble() {
            session.send(&line)?;
        }
        session.state = DialogueState::Declaring;
        Ok(session)
    }

    /// Sends one command with no response expected (declarations,
    /// assertions, push/pop).
    pub fn send(&mut self, command: &str) -> QResult<()> {
        self.log.sent(command);
        writeln!(self.stdin, "{}", command).map_err(QError::Io)?;
        self.stdin.flush().map_err(QError::Io)
    }

    fn read_line(&mut self) -> QResult<String> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).map_err(QError::Io)?;
        if n == 0 {
            return Err(QError::SmtProcessError {
                message: "solver process closed its stdout".to_string(),
            });
        }
        self.log.received(line.trim_end());
        Ok(line)
    }

    /// New symbols can be declared at any point between queries (never
    /// inside a still-open `push`/`pop` bracket, since a declaration made
    /// there would vanish on `pop` along with everything else in scope).
    pub fn declare_fun(&mut self, line: &str) -> QResult<()> {
        debug_assert_ne!(
            self.state,
            DialogueState::Asserting,
            "must not declare new symbols inside an open push/pop bracket"
        );
        self.state = DialogueState::Declaring;
        self.send(line)
    }

    pub fn assert(&mut self, line: &str) -> QResult<()> {
        self.state = DialogueState::Asserting;
        self.send(line)
    }

    pub fn push(&mut self) -> QResult<()> {
        self.send("(push 1)")
    }

    pub fn pop(&mut self) -> QResult<()> {
        self.send("(pop 1)")
    }

    /// Runs `(check-sat)` followed by the backend's interpolant request,
    /// and parses the interpolant terms out of the response (§4.5 step 4,
    /// §4.8 "Top-level satisfiability must hold"). The asserted formula is
    /// the negation of the implication being checked, so `unsat` is the
    /// only outcome interpolation assumes. A `sat` response or an
    /// `unknown` response are both fatal protocol errors for the current
    /// query (§4.8, §7: "the solver returned sat on an interpolation
    /// query, unknown, ..." is `SmtProtocolError`, fatal) — neither is
    /// silently swallowed here.
    #[instrument(skip(self))]
    pub fn check_and_interpolate(&mut self) -> QResult<Vec<SExpr>> {
        self.state = DialogueState::WaitingSat;
        self.send("(check-sat)")?;
        let response = self.read_line()?;
        match response.trim() {
            "unsat" => {}
            "sat" => {
                self.state = DialogueState::Idle;
                return Err(QError::SmtProtocolError {
                    message: "solver returned sat on an interpolation query; interpolation assumes unsat".to_string(),
                });
            }
            "unknown" => {
                self.state = DialogueState::Idle;
                return Err(QError::SmtProtocolError {
                    message: "solver returned unknown on an interpolation query".to_string(),
                });
            }
            other => {
                self.state = DialogueState::Idle;
                return Err(QError::SmtProtocolError {
                    message: format!("unexpected check-sat response: `{}`", other.trim()),
                });
            }
        }

        self.state = DialogueState::WaitingInterp;
        self.send(self.backend.interpolant_command())?;
        let response = self.read_line()?;
        let parsed = sexpr::parse_sexprs(&response)?;
        self.state = DialogueState::Idle;
        Ok(flatten_interpolant_response(parsed))
    }

    pub fn shutdown(mut self) -> QResult<()> {
        self.send("(exit)")?;
        self.child.wait().map_err(QError::Io)?;
        Ok(())
    }
}

/// Most backends wrap the list of tree-interpolant terms in an outer
/// `(interpolants ...)`/bare list form; this unwraps one layer of nesting
/// if present so callers always see a flat list of interpolant terms.
fn flatten_interpolant_response(mut parsed: Vec<SExpr>) -> Vec<SExpr> {
    if parsed.len() == 1 {
        if let SExpr::List(inner) = &parsed[0] {
            if inner.first().and_then(SExpr::as_atom) != Some("error") {
                return inner.clone();
            }
        }
    }
    std::mem::take(&mut parsed)
}
