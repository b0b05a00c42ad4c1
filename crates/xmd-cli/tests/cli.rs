use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn xmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_xmd"))
}

fn temp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let mut path = env::temp_dir();
    path.push(format!(
        "xmd_cli_{}_{}_{}_{}",
        name,
        std::process::id(),
        now.as_secs(),
        now.subsec_nanos()
    ));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = temp_dir(name).join(format!("{name}.md"));
    fs::write(&path, contents).expect("write temp file");
    path
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = xmd()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("run")
}

#[test]
fn stdin_raw_prints_fragment() {
    let output = run_with_stdin(&["--raw"], "Paragraph.\n");
    assert!(output.status.success(), "expected success exit code");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "<p>\n  Paragraph.\n</p>\n");
}

#[test]
fn stdin_defaults_to_full_document_on_stdout() {
    let output = run_with_stdin(&["--theme", "dark"], "# Hello\n");
    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("<!DOCTYPE html>"), "expected HTML wrapper");
    assert!(stdout.contains("<style>"), "expected inline CSS");
    assert!(stdout.contains("<h1 id=\"hello\">Hello</h1>"));
}

#[test]
fn diagnostics_json_reports_warning_and_exit_code() {
    let input = temp_file("ref_missing", "[text][missing]\n");
    let output = xmd()
        .args(["--stdout", "--raw", "--diagnostics", "json"])
        .arg(&input)
        .output()
        .expect("run");

    assert!(output.status.success(), "warnings must not fail the run");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("\"code\": \"W_REF_MISSING\""),
        "expected W_REF_MISSING in stderr: {stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[text][missing]"), "expected literal fallback");
}

#[test]
fn diagnostics_pretty_lists_position_and_code() {
    let input = temp_file("footnote_missing", "Cite[^nope].\n");
    let output = xmd()
        .args(["--stdout", "--diagnostics", "pretty"])
        .arg(&input)
        .output()
        .expect("run");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("1:5:warning W_FOOTNOTE_MISSING"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn writes_stem_html_into_working_directory() {
    let input = temp_file("stem", "Paragraph.\n");
    let work = temp_dir("work");
    let output = xmd().arg(&input).current_dir(&work).output().expect("run");

    assert!(output.status.success());
    let html = fs::read_to_string(work.join("stem.html")).expect("output file");
    assert!(html.contains("<title>stem</title>"));
    assert!(html.contains("<p>\n  Paragraph.\n</p>"));
}

#[test]
fn output_directory_receives_stem_html_and_overwrites_with_notice() {
    let input = temp_file("into_dir", "- a\n- b\n");
    let out_dir = temp_dir("out");

    let first = xmd().arg(&input).arg(&out_dir).output().expect("run");
    assert!(first.status.success());
    assert!(out_dir.join("into_dir.html").is_file());

    let second = xmd().arg(&input).arg(&out_dir).output().expect("run");
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("overwriting"));
}

#[test]
fn external_css_writes_stylesheet_next_to_output() {
    let input = temp_file("external", "text\n");
    let out_dir = temp_dir("external_out");
    let target = out_dir.join("page.html");
    let output = xmd()
        .arg("--external-css")
        .arg(&input)
        .arg(&target)
        .output()
        .expect("run");

    assert!(output.status.success());
    let html = fs::read_to_string(&target).expect("page");
    assert!(!html.contains("<style>"));
    assert!(html.contains("href=\"xmd.css\""));
    assert!(out_dir.join("xmd.css").is_file());
}

#[test]
fn toc_precedes_content() {
    let output = run_with_stdin(&["--raw", "--toc"], "# A\n\n## B\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("<ul class=\"toc\">"), "unexpected output: {stdout}");
    assert!(stdout.contains("<h2 id=\"b\">B</h2>"));
}

#[test]
fn sanitized_strips_script_urls() {
    let output = run_with_stdin(&["--raw", "--sanitized"], "[x](javascript:alert)\n");
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("javascript"));
}

#[test]
fn usage_errors_exit_with_two() {
    let output = xmd().args(["--theme", "sepia"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: xmd"));
}

#[test]
fn missing_input_fails() {
    let output = xmd()
        .args(["--stdout", "/definitely/not/here.md"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
