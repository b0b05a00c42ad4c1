use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use xmd_core::{
    Diagnostic, DiagnosticSeverity, ParseOptions, parse_with_options, render, render_sanitized,
    render_toc,
};
use xmd_renderer::{Renderer, Theme};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    raw: bool,
    sanitized: bool,
    theme: Theme,
    no_highlight: bool,
    toc: bool,
    stdout: bool,
    external_css: bool,
    diagnostics: Option<DiagnosticsMode>,
}

#[derive(Clone, Copy, Debug)]
enum DiagnosticsMode {
    Json,
    Pretty,
}

/// `Ok(None)` asks for the usage text.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<Args>, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--raw" => parsed.raw = true,
            "--sanitized" => parsed.sanitized = true,
            "--no-highlight" => parsed.no_highlight = true,
            "--toc" => parsed.toc = true,
            "--stdout" => parsed.stdout = true,
            "--external-css" => parsed.external_css = true,
            "--theme" => {
                let value = args.next().ok_or("--theme expects: auto | light | dark")?;
                parsed.theme = value.parse()?;
            }
            "--diagnostics" => {
                parsed.diagnostics = Some(match args.next().as_deref() {
                    Some("json") => DiagnosticsMode::Json,
                    Some("pretty") => DiagnosticsMode::Pretty,
                    _ => return Err("--diagnostics expects: json | pretty".to_string()),
                });
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {flag}")),
            _ if parsed.input.is_none() => parsed.input = Some(PathBuf::from(arg)),
            _ if parsed.output.is_none() => parsed.output = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }
    Ok(Some(parsed))
}

fn print_usage() {
    eprintln!(
        "Usage: xmd [--raw] [--sanitized] [--theme auto|light|dark] [--no-highlight] [--toc] \
         [--stdout] [--external-css] [--diagnostics json|pretty] [input] [output]"
    );
}

fn run(args: &Args) -> Result<()> {
    let source = read_source(args.input.as_deref())?;
    let stem = args
        .input
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .unwrap_or("document")
        .to_string();

    let mut renderer = Renderer::new(args.theme);
    if args.input.is_some() {
        renderer = renderer.with_title(&stem);
    }
    let highlighter = (!args.no_highlight).then(|| renderer.highlighter());
    let mut options = ParseOptions::default();
    if let Some(highlighter) = &highlighter {
        options = options.with_highlighter(highlighter);
    }

    let state = parse_with_options(&source, &options);
    log::debug!(
        "parsed {} blocks into {} tokens",
        state.blocks.len(),
        state.tokens.len()
    );
    if let Some(mode) = args.diagnostics {
        emit_diagnostics(&state.diagnostics, mode);
    }

    let mut html = if args.sanitized {
        render_sanitized(&state)
    } else {
        render(&state)
    };
    if args.toc {
        let toc = render_toc(&state);
        if !toc.is_empty() {
            html = format!("{toc}\n{html}");
        }
    }

    let target = output_path(args, &stem);
    let inline_css = !(args.external_css && target.is_some());
    if !args.raw {
        html = renderer.embed_html(&html, inline_css);
    }
    if !html.ends_with('\n') {
        html.push('\n');
    }

    match target {
        None => io::stdout()
            .write_all(html.as_bytes())
            .context("failed to write stdout")?,
        Some(path) => {
            if path.is_file() {
                eprintln!("overwriting {}", path.display());
            }
            fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
            if !args.raw && !inline_css {
                let dir = path.parent().unwrap_or(Path::new("."));
                renderer
                    .generate_files(dir)
                    .with_context(|| format!("failed to write stylesheet into {}", dir.display()))?;
            }
            log::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn read_source(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// `None` means stdout.
fn output_path(args: &Args, stem: &str) -> Option<PathBuf> {
    if args.stdout {
        return None;
    }
    let file_name = format!("{stem}.html");
    match &args.output {
        Some(output) if output.is_dir() => Some(output.join(file_name)),
        Some(output) => Some(output.clone()),
        None if args.input.is_some() => Some(PathBuf::from(file_name)),
        None => None,
    }
}

fn emit_diagnostics(diagnostics: &[Diagnostic], mode: DiagnosticsMode) {
    match mode {
        DiagnosticsMode::Json => eprintln!("{}", diagnostics_to_json(diagnostics)),
        DiagnosticsMode::Pretty => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic_to_pretty(diagnostic));
            }
        }
    }
}

fn diagnostic_to_pretty(diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}:{} {} {}",
        diagnostic.point.line,
        diagnostic.point.column,
        severity_label(diagnostic.severity),
        diagnostic.code,
        diagnostic.message
    )
}

fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "[]".to_string();
    }

    let mut out = String::new();
    out.push_str("[\n");
    for (idx, diag) in diagnostics.iter().enumerate() {
        out.push_str("  {\n");
        out.push_str(&format!("    \"code\": \"{}\",\n", diag.code));
        out.push_str(&format!(
            "    \"severity\": \"{}\",\n",
            severity_label(diag.severity)
        ));
        out.push_str(&format!(
            "    \"message\": \"{}\",\n",
            escape_json(&diag.message)
        ));
        out.push_str(&format!(
            "    \"point\": {{ \"line\": {}, \"column\": {}, \"offset\": {} }}\n",
            diag.point.line, diag.point.column, diag.point.offset
        ));
        out.push_str("  }");
        if idx + 1 < diagnostics.len() {
            out.push_str(",\n");
        } else {
            out.push('\n');
        }
    }
    out.push(']');
    out
}

fn severity_label(severity: DiagnosticSeverity) -> &'static str {
    match severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
    }
}

fn escape_json(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_control() => out.push_str(&format!("\\u{:04x}", ch as u32)),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Args, escape_json, output_path, parse_args};
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Result<Option<Args>, String> {
        parse_args(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn positional_input_and_output() {
        let parsed = args(&["--toc", "in.md", "out.html"]).unwrap().unwrap();
        assert!(parsed.toc);
        assert_eq!(parsed.input, Some(PathBuf::from("in.md")));
        assert_eq!(parsed.output, Some(PathBuf::from("out.html")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(args(&["--theme", "sepia"]).is_err());
        assert!(args(&["--diagnostics"]).is_err());
        assert!(args(&["a", "b", "c"]).is_err());
        assert!(args(&["--frobnicate"]).is_err());
        assert!(args(&["-h"]).unwrap().is_none());
    }

    #[test]
    fn output_defaults_to_input_stem() {
        let parsed = args(&["notes/today.md"]).unwrap().unwrap();
        assert_eq!(output_path(&parsed, "today"), Some(PathBuf::from("today.html")));

        let piped = args(&[]).unwrap().unwrap();
        assert_eq!(output_path(&piped, "document"), None);

        let forced = args(&["--stdout", "a.md"]).unwrap().unwrap();
        assert_eq!(output_path(&forced, "a"), None);
    }

    #[test]
    fn json_escapes_control_characters() {
        assert_eq!(escape_json("a\"b\u{1}"), "a\\\"b\\u0001");
    }
}
