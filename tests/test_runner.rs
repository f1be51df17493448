use std::path::Path;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

include!(concat!(env!("OUT_DIR"), "/test_files.rs"));

const EXPECT_OUTPUT: &str = "// expect: ";
const EXPECT_RUNTIME_ERROR: &str = "// expect runtime error: ";
const EXPECT_ERROR: &str = "// expect error: ";

#[derive(Debug, Default)]
struct Expectations {
    output: Vec<String>,
    errors: Vec<String>,
    runtime_error: Option<String>,
}

impl Expectations {
    fn exit_code(&self) -> i32 {
        if !self.errors.is_empty() {
            65
        } else if self.runtime_error.is_some() {
            70
        } else {
            0
        }
    }
}

fn do_test(filename: &Path) {
    let expect = find_expects(filename);

    let output = Command::cargo_bin("mgr")
        .unwrap()
        .arg(filename)
        .write_stdin("")
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(expect.output, lines, "stderr={stderr}");

    for error in &expect.errors {
        assert!(stderr.contains(error.as_str()), "missing {error:?} in stderr={stderr}");
    }
    if let Some(error) = &expect.runtime_error {
        assert!(stderr.contains(error.as_str()), "missing {error:?} in stderr={stderr}");
    }

    assert_eq!(Some(expect.exit_code()), output.status.code(), "stderr={stderr}");
}

fn find_expects(filename: &Path) -> Expectations {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let mut result = Expectations::default();
    for line in content.lines() {
        if let Some((_, target)) = line.split_once(EXPECT_OUTPUT) {
            result.output.push(target.to_owned());
        } else if let Some((_, target)) = line.split_once(EXPECT_RUNTIME_ERROR) {
            result.runtime_error = Some(target.to_owned());
        } else if let Some((_, target)) = line.split_once(EXPECT_ERROR) {
            result.errors.push(target.to_owned());
        }
    }

    result
}
