use crate::error::{SearchError, SearchResult};
use crate::solver::{Decision, SOLUTION_MARKER, SolverRunner, count_markers_in_log};
use log::{debug, trace};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Name of the CNF file STP writes when asked for `--output-CNF`.
const CNF_FILE: &str = "output_0.cnf";

/// Locations of the solver executables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverPaths {
    pub stp: PathBuf,
    pub boolector: PathBuf,
    pub cryptominisat: PathBuf,
}

impl Default for SolverPaths {
    fn default() -> Self {
        SolverPaths {
            stp: PathBuf::from("stp"),
            boolector: PathBuf::from("boolector"),
            cryptominisat: PathBuf::from("cryptominisat5"),
        }
    }
}

/// Which solver decides single constraint files.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecisionBackend {
    Stp,
    /// STP translates the problem to SMT-LIB2, Boolector decides it.
    Boolector,
}

/// [`SolverRunner`] backed by STP (or Boolector) for decisions and by CryptoMiniSat for
/// solution counting.
#[derive(Clone, Debug)]
pub struct ExternalSolver {
    pub backend: DecisionBackend,
    pub paths: SolverPaths,
    /// Upper bound on the number of solutions CryptoMiniSat enumerates
    /// (default: `10_000_000`).
    pub max_solutions: usize,
}

impl ExternalSolver {
    pub fn new(backend: DecisionBackend) -> ExternalSolver {
        ExternalSolver {
            backend,
            paths: SolverPaths::default(),
            max_solutions: 10_000_000,
        }
    }
}

impl SolverRunner for ExternalSolver {
    fn solve(&self, constraint_file: &Path) -> SearchResult<Decision> {
        match self.backend {
            DecisionBackend::Stp => {
                let output = run(
                    &self.paths.stp,
                    &[constraint_file.as_os_str(), OsStr::new("--CVC")],
                    None,
                    true,
                )?;
                // STP reports `Valid.` when the negated query holds, i.e. there is no solution.
                if output.contains("Valid.") {
                    Ok(Decision::Unsatisfiable)
                } else {
                    Ok(Decision::Satisfiable(output))
                }
            }
            DecisionBackend::Boolector => {
                let smt = run(
                    &self.paths.stp,
                    &[
                        OsStr::new("--print-back-SMTLIB2"),
                        constraint_file.as_os_str(),
                    ],
                    None,
                    true,
                )?;
                let output = run(
                    &self.paths.boolector,
                    &[OsStr::new("-x"), OsStr::new("-m")],
                    Some(smt.as_bytes()),
                    // Boolector exits with 10/20 for SAT/UNSAT.
                    false,
                )?;
                if output.lines().next().map(str::trim) == Some("sat") {
                    Ok(Decision::Satisfiable(output))
                } else {
                    Ok(Decision::Unsatisfiable)
                }
            }
        }
    }

    fn count_solutions(&self, constraint_file: &Path, log_file: &Path) -> SearchResult<u64> {
        let absolute = constraint_file
            .canonicalize()
            .map_err(|e| SearchError::io(constraint_file, e))?;

        // STP writes the CNF into its working directory, which is private to the log file.
        let directory = cnf_directory(log_file);
        std::fs::create_dir_all(&directory).map_err(|e| SearchError::io(&directory, e))?;
        let cnf = directory.join(CNF_FILE);
        match std::fs::remove_file(&cnf) {
            Ok(()) => trace!("Removed stale `{}`.", cnf.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => return Err(SearchError::io(&cnf, e)),
        }

        let stp_name = display_name(&self.paths.stp);
        let status = Command::new(&self.paths.stp)
            .current_dir(&directory)
            .arg("--exit-after-CNF")
            .arg("--output-CNF")
            .arg(&absolute)
            .arg("--CVC")
            .arg("--disable-simplifications")
            .stdout(Stdio::null())
            .status()
            .map_err(|e| SearchError::solver(&stp_name, e.to_string()))?;
        if !status.success() {
            return Err(SearchError::solver(
                &stp_name,
                format!("exited with {status}"),
            ));
        }
        if !cnf.exists() {
            return Err(SearchError::solver(
                &stp_name,
                format!("no CNF written to `{}`", cnf.display()),
            ));
        }

        let sat_name = display_name(&self.paths.cryptominisat);
        let child = Command::new(&self.paths.cryptominisat)
            .current_dir(&directory)
            .arg("--maxsol")
            .arg(self.max_solutions.to_string())
            .args(["--verb", "0", "-s", "0", CNF_FILE])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SearchError::solver(&sat_name, e.to_string()))?;
        let mut child = ChildGuard(child);

        let stdout = child
            .0
            .stdout
            .take()
            .ok_or_else(|| SearchError::solver(&sat_name, "stdout is not captured"))?;
        let log = File::create(log_file).map_err(|e| SearchError::io(log_file, e))?;
        let mut log = BufWriter::new(log);

        let mut solutions = 0u64;
        for line in BufReader::new(stdout).lines() {
            let line = line.map_err(|e| SearchError::solver(&sat_name, e.to_string()))?;
            writeln!(log, "{line}").map_err(|e| SearchError::io(log_file, e))?;
            if line.contains(SOLUTION_MARKER) {
                solutions += 1;
                if solutions % 100 == 0 {
                    trace!("Solutions so far: {}", solutions / 2);
                }
            }
        }
        log.flush().map_err(|e| SearchError::io(log_file, e))?;
        drop(log);

        // CryptoMiniSat exits with 10/20 for SAT/UNSAT, so the status itself is not checked.
        child
            .0
            .wait()
            .map_err(|e| SearchError::solver(&sat_name, e.to_string()))?;

        let logged = count_markers_in_log(log_file)?;
        if logged != solutions {
            return Err(SearchError::InconsistentCount(format!(
                "streamed {solutions} solution markers, but `{}` contains {logged}",
                log_file.display()
            )));
        }

        debug!("Solver reported {} raw solutions.", solutions);
        Ok(solutions)
    }
}

/// Kills and reaps the child process on every exit path.
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            let _ = self.0.kill();
        }
        let _ = self.0.wait();
    }
}

/// Working directory of the CNF export for `log_file` (e.g. `satlog42.tmp` uses
/// `satlog42.cnf/`). Log files are named per run, so concurrent runs never share it.
fn cnf_directory(log_file: &Path) -> PathBuf {
    log_file.with_extension("cnf")
}

fn display_name(program: &Path) -> String {
    program.display().to_string()
}

/// Run a program to completion and return its standard output.
fn run(
    program: &Path,
    args: &[&OsStr],
    input: Option<&[u8]>,
    require_success: bool,
) -> SearchResult<String> {
    let name = display_name(program);
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = command
        .spawn()
        .map_err(|e| SearchError::solver(&name, e.to_string()))?;
    if let Some(input) = input {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SearchError::solver(&name, "stdin is not captured"))?;
        stdin
            .write_all(input)
            .map_err(|e| SearchError::solver(&name, e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| SearchError::solver(&name, e.to_string()))?;
    if require_success && !output.status.success() {
        return Err(SearchError::solver(
            &name,
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    String::from_utf8(output.stdout).map_err(|e| SearchError::solver(&name, e.to_string()))
}
