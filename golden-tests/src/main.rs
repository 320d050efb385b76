use anyhow::{Context, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

static EXPECTED_STDOUT_FILE: &str = "expected-stdout";
static EXPECTED_STDERR_FILE: &str = "expected-stderr";

struct TestCase {
    dir: PathBuf,
    name: String,
    args: String,
    expected_stdout: Option<String>,
    expected_stderr: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let mut test_cases = Vec::new();
    let test_dirs =
        std::fs::read_dir("golden-tests/tests").context("golden tests root directory not found")?;
    for entry in test_dirs {
        let entry = entry?;
        let path = entry.path();

        if !path.is_dir() {
            println!(
                "skipping path `{}` because it's not a directory",
                path.display()
            );
            continue;
        }

        let args_path = path.join("args");
        let args = std::fs::read_to_string(&args_path)
            .with_context(|| format!("no `args` file found at `{}`", args_path.display()))?;

        test_cases.push(TestCase {
            name: path.display().to_string(),
            expected_stdout: read_expected(&path, EXPECTED_STDOUT_FILE)?,
            expected_stderr: read_expected(&path, EXPECTED_STDERR_FILE)?,
            dir: path,
            args,
        })
    }
    test_cases.sort_by(|a, b| a.name.cmp(&b.name));

    let mut errored = false;
    for test_case in test_cases {
        let name = test_case.name.clone();
        if let Err(e) = run_netlab(test_case) {
            println!("Error running golden test `{name}`");
            match e {
                TestError::Internal(e) => println!("{e:?}"),
                TestError::Compare(e) => {
                    if let Some(diff) = e.stdout_diff {
                        println!("Expected stdout differs from actual stdout:\n{diff}\n");
                    }

                    if let Some(diff) = e.stderr_diff {
                        println!("Expected stderr differs from actual stderr:\n{diff}");
                    }
                }
            }
            errored = true;
        } else {
            println!("{name}: ✅");
        }
    }

    if errored {
        bail!("one or more golden tests failed");
    }

    Ok(())
}

/// Reads an expected output file, which is missing the first time a test case runs
fn read_expected(dir: &Path, file: &str) -> anyhow::Result<Option<String>> {
    let path = dir.join(file);
    if !path.is_file() {
        return Ok(None);
    }

    std::fs::read_to_string(&path)
        .map(Some)
        .with_context(|| format!("failed to read `{}`", path.display()))
}

enum TestError {
    Internal(anyhow::Error),
    Compare(CompareError),
}

struct CompareError {
    stdout_diff: Option<String>,
    stderr_diff: Option<String>,
}

/// Runs `netlab` from within the test case's directory, so `args` can refer to its files
fn run_netlab(test_case: TestCase) -> Result<(), TestError> {
    let netlab_args = test_case.args.split_whitespace();
    let command = Command::new("cargo")
        .current_dir(&test_case.dir)
        .env("RUST_LOG", "off")
        .arg("run")
        .arg("--quiet")
        .arg("--release")
        .arg("--bin")
        .arg("netlab")
        .arg("--")
        .args(netlab_args)
        .output()
        .context("netlab process crashed")
        .map_err(TestError::Internal)?;

    let stdout = String::from_utf8_lossy(&command.stdout);
    let stderr = String::from_utf8_lossy(&command.stderr);

    let stdout_diff = compare(
        &test_case.dir,
        EXPECTED_STDOUT_FILE,
        test_case.expected_stdout,
        &stdout,
    )?;
    let stderr_diff = compare(
        &test_case.dir,
        EXPECTED_STDERR_FILE,
        test_case.expected_stderr,
        &stderr,
    )?;

    if stdout_diff.is_some() || stderr_diff.is_some() {
        Err(TestError::Compare(CompareError {
            stdout_diff,
            stderr_diff,
        }))
    } else {
        Ok(())
    }
}

/// Diffs `actual` against the expected output, or records it if there is none yet
fn compare(
    dir: &Path,
    file: &str,
    expected: Option<String>,
    actual: &str,
) -> Result<Option<String>, TestError> {
    match expected {
        Some(expected) if expected != actual => Ok(Some(diff::diff_to_string(&expected, actual))),
        Some(_) => Ok(None),
        None => {
            std::fs::write(dir.join(file), actual.as_bytes())
                .with_context(|| format!("failed to persist `{file}`"))
                .map_err(TestError::Internal)?;
            Ok(None)
        }
    }
}

mod diff {
    use console::{Style, style};
    use similar::{ChangeTag, TextDiff};
    use std::fmt::{self, Write};

    struct Line(Option<usize>);

    impl fmt::Display for Line {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            match self.0 {
                None => write!(f, "    "),
                Some(idx) => write!(f, "{:<4}", idx + 1),
            }
        }
    }

    pub fn diff_to_string(old: &str, new: &str) -> String {
        let mut output = String::new();
        let diff = TextDiff::from_lines(old, new);

        for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
            if idx > 0 {
                _ = writeln!(output, "{:-^1$}", "-", 80);
            }
            for op in group {
                for change in diff.iter_inline_changes(op) {
                    let (sign, s) = match change.tag() {
                        ChangeTag::Delete => ("-", Style::new().red()),
                        ChangeTag::Insert => ("+", Style::new().green()),
                        ChangeTag::Equal => (" ", Style::new().dim()),
                    };
                    _ = write!(
                        output,
                        "{}{} |{}",
                        style(Line(change.old_index())).dim(),
                        style(Line(change.new_index())).dim(),
                        s.apply_to(sign).bold(),
                    );
                    for (emphasized, value) in change.iter_strings_lossy() {
                        if emphasized {
                            _ = write!(output, "{}", s.apply_to(value).underlined().on_black());
                        } else {
                            _ = write!(output, "{}", s.apply_to(value));
                        }
                    }
                    if change.missing_newline() {
                        _ = writeln!(output);
                    }
                }
            }
        }

        output
    }
}
