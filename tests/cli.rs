mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{PageSpec, build_pdf, paragraph_texts};

fn run_cli(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdf-to-word"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run pdf-to-word")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn sample_pdf(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("sample.pdf");
    let bytes = build_pdf(&[PageSpec::text(&[
        (72.0, 760.0, 20.0, "Quarterly Report"),
        (72.0, 720.0, 12.0, "Revenue grew in every region this"),
        (72.0, 706.0, 12.0, "quarter, led by strong demand."),
    ])]);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn wrong_argument_count_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.pdf");
    let b = dir.path().join("b.docx");
    let c = dir.path().join("c");

    for args in [vec![], vec![a.as_path()], vec![a.as_path(), b.as_path(), c.as_path()]] {
        let output = run_cli(&args);
        assert_eq!(output.status.code(), Some(1), "args: {args:?}");
        assert!(stdout(&output).contains("Usage:"), "stdout: {}", stdout(&output));
    }
    assert!(!b.exists());
}

#[test]
fn end_of_options_marker_counts_as_an_argument() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_pdf(dir.path());
    let output_path = dir.path().join("out.docx");

    let output = run_cli(&[Path::new("--"), input.as_path(), output_path.as_path()]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("Usage:"), "stdout: {out}");
    assert!(!out.contains("Starting conversion"), "stdout: {out}");
    assert!(!output_path.exists());
}

#[test]
fn missing_input_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("does-not-exist.pdf");
    let output_path = dir.path().join("out.docx");

    let output = run_cli(&[input.as_path(), output_path.as_path()]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("NOT found"), "stdout: {out}");
    assert!(out.contains(input.to_str().unwrap()), "stdout: {out}");
    assert!(!output_path.exists());
}

#[test]
fn converts_valid_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_pdf(dir.path());
    let output_path = dir.path().join("report.docx");

    let output = run_cli(&[input.as_path(), output_path.as_path()]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Starting conversion"), "stdout: {out}");
    assert!(out.contains("Conversion successful"), "stdout: {out}");

    assert!(std::fs::metadata(&output_path).unwrap().len() > 0);
    assert_eq!(
        paragraph_texts(&output_path),
        vec![
            "Quarterly Report",
            "Revenue grew in every region this quarter, led by strong demand.",
        ]
    );
}

#[test]
fn corrupt_pdf_fails_with_prefixed_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.pdf");
    std::fs::write(&input, b"this is definitely not a PDF document").unwrap();
    let output_path = dir.path().join("broken.docx");

    let output = run_cli(&[input.as_path(), output_path.as_path()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    let line = err
        .lines()
        .find(|l| l.starts_with("Error during conversion: "))
        .unwrap_or_else(|| panic!("no prefixed error in stderr: {err}"));
    assert!(line.len() > "Error during conversion: ".len());
    assert!(!stdout(&output).contains("Conversion successful"));
}

#[test]
fn repeated_conversion_overwrites_identically() {
    let dir = tempfile::tempdir().unwrap();
    let input = sample_pdf(dir.path());
    let output_path = dir.path().join("report.docx");

    let first = run_cli(&[input.as_path(), output_path.as_path()]);
    assert_eq!(first.status.code(), Some(0));
    let first_bytes = std::fs::read(&output_path).unwrap();

    let second = run_cli(&[input.as_path(), output_path.as_path()]);
    assert_eq!(second.status.code(), Some(0));
    let second_bytes = std::fs::read(&output_path).unwrap();

    assert_eq!(first_bytes, second_bytes);
}
