use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use loxparse::interpreter::Interpreter;
use loxparse::{lexer, parser, resolver};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum CaseClass {
    RuntimeSuccess,
    CompileError,
    RuntimeError,
}

#[derive(Debug, Deserialize, Clone)]
struct ExpectedOutcome {
    exit_code: i32,
    stdout_file: Option<String>,
    stderr_contains: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct CaseSpec {
    class: CaseClass,
    expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
struct Case {
    name: String,
    dir: PathBuf,
    program_path: PathBuf,
    spec: CaseSpec,
}

impl Case {
    fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }
}

fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let program_path = path.join("program.lox");
        ensure!(
            program_path.exists(),
            "Missing program.lox for case {}",
            path.display()
        );

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

/// Runs the full pipeline the way the `run` mode of the binary does and
/// reports (exit code, stdout, stderr).
fn run_pipeline(source: &str) -> (i32, String, String) {
    let mut stderr = String::new();

    let (tokens, scan_diagnostics) = lexer::tokenize(source);
    let (statements, parse_diagnostics) = parser::parse_tokens(tokens);
    for diagnostic in scan_diagnostics.iter().chain(&parse_diagnostics) {
        stderr.push_str(&diagnostic.to_string());
        stderr.push('\n');
    }
    if !scan_diagnostics.is_empty() || !parse_diagnostics.is_empty() {
        return (65, String::new(), stderr);
    }

    let (locals, resolve_diagnostics) = resolver::resolve(&statements);
    for diagnostic in &resolve_diagnostics {
        stderr.push_str(&diagnostic.to_string());
        stderr.push('\n');
    }
    if !resolve_diagnostics.is_empty() {
        return (65, String::new(), stderr);
    }

    let mut interpreter = Interpreter::new(false);
    interpreter.resolve(locals);
    let result = interpreter.interpret(&statements);
    let stdout = interpreter.output().join("\n");
    match result {
        Ok(()) => (0, stdout, stderr),
        Err(error) => {
            stderr.push_str(&format!("{error}\n[line {}]\n", error.line()));
            (70, stdout, stderr)
        }
    }
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in cases {
        let source = fs::read_to_string(&case.program_path)
            .with_context(|| format!("Reading {}", case.name))?;
        let (exit_code, stdout, stderr) = run_pipeline(&source);

        ensure!(
            exit_code == case.spec.expected.exit_code,
            "Case {} expected exit code {}, got {} (stderr: {stderr})",
            case.name,
            case.spec.expected.exit_code,
            exit_code
        );

        match case.spec.class {
            CaseClass::RuntimeSuccess => {
                let stdout_file = case
                    .spec
                    .expected
                    .stdout_file
                    .as_deref()
                    .with_context(|| format!("Missing stdout_file in {}", case.name))?;
                let expected = case.read_text(stdout_file)?;
                assert_eq!(
                    normalize_output(&stdout),
                    normalize_output(&expected),
                    "Output mismatch for {}",
                    case.name
                );
            }
            CaseClass::CompileError | CaseClass::RuntimeError => {
                let expected_fragment = case
                    .spec
                    .expected
                    .stderr_contains
                    .as_deref()
                    .with_context(|| format!("Missing stderr_contains in {}", case.name))?;
                ensure!(
                    stderr.contains(expected_fragment),
                    "Expected stderr containing '{expected_fragment}' in {}, got '{stderr}'",
                    case.name
                );
            }
        }
    }

    Ok(())
}
