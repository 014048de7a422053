use std::{env, fs, process::ExitCode, time::Instant};

use argus::{Analyzer, Colors, Platform, Settings, Severity, Suppressions, assemble_results};

const USAGE: &str = "\
usage: argus [options] file...

options:
  --enable=<group>        enable a severity group: warning, style,
                          performance, portability, information, all
  --platform=<name>       unix32, unix64 (default), win32, win64
  --platform-file=<file>  load a platform definition from JSON
  --library=<file>        load function models from JSON
  --suppressions=<file>   load a suppressions file
  --suppress=<spec>       add one suppression (id[:file[:line]])
  --template=<tmpl>       output template
  --inconclusive          report inconclusive findings
  --debug-warnings        report value-flow bailouts
  --no-color              disable ANSI colors
  --verbose               use the verbose message text
  --time                  print elapsed analysis time
";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprint!("{USAGE}");
        return ExitCode::FAILURE;
    }

    let mut settings = Settings::default();
    settings.colors = Colors::new(true);
    let mut files: Vec<String> = Vec::new();
    let mut show_time = false;

    for arg in &args {
        if let Some(group) = arg.strip_prefix("--enable=") {
            for name in group.split(',') {
                if !settings.enabled.enable(name) {
                    eprintln!("error: unknown --enable group '{name}'");
                    return ExitCode::FAILURE;
                }
            }
        } else if let Some(name) = arg.strip_prefix("--platform=") {
            match Platform::from_name(name) {
                Some(platform) => settings.platform = platform,
                None => {
                    eprintln!("error: unknown platform '{name}'");
                    return ExitCode::FAILURE;
                }
            }
        } else if let Some(path) = arg.strip_prefix("--platform-file=") {
            match read_file(path).and_then(|json| {
                Platform::from_json(&json).map_err(|e| e.to_string())
            }) {
                Ok(platform) => settings.platform = platform,
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::FAILURE;
                }
            }
        } else if let Some(path) = arg.strip_prefix("--library=") {
            let loaded = read_file(path)
                .and_then(|json| settings.library.load_json(&json).map_err(|e| e.to_string()));
            if let Err(err) = loaded {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        } else if let Some(path) = arg.strip_prefix("--suppressions=") {
            match read_file(path).and_then(|text| Suppressions::parse_text(&text).map_err(|e| e.to_string())) {
                Ok(sups) => {
                    for entry in sups.entries() {
                        settings.suppressions.add(entry.clone());
                    }
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::FAILURE;
                }
            }
        } else if let Some(spec) = arg.strip_prefix("--suppress=") {
            match argus::Suppression::parse_line(spec) {
                Ok(sup) => settings.suppressions.add(sup),
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::FAILURE;
                }
            }
        } else if let Some(template) = arg.strip_prefix("--template=") {
            settings.output_template = template.to_owned();
        } else if arg == "--inconclusive" {
            settings.inconclusive = true;
        } else if arg == "--debug-warnings" {
            settings.debug_warnings = true;
        } else if arg == "--no-color" {
            settings.colors = Colors::new(false);
        } else if arg == "--verbose" {
            settings.verbose = true;
        } else if arg == "--time" {
            show_time = true;
        } else if arg == "--help" || arg == "-h" {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        } else if arg.starts_with("--") {
            eprintln!("error: unknown option '{arg}'");
            return ExitCode::FAILURE;
        } else {
            files.push(arg.clone());
        }
    }
    if files.is_empty() {
        eprintln!("error: no input files");
        return ExitCode::FAILURE;
    }
    files.sort();

    let start = Instant::now();
    let analyzer = Analyzer::new(settings);
    let mut results = Vec::with_capacity(files.len());
    for path in &files {
        let code = match read_file(path) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        };
        results.push((path.clone(), analyzer.analyze_source(path, &code)));
    }

    let settings = analyzer.settings();
    let template = if settings.verbose {
        settings.output_template.replace("{message}", "{verbose}")
    } else {
        settings.output_template.clone()
    };
    let diagnostics = assemble_results(results, settings);
    let mut worst: Option<Severity> = None;
    for msg in &diagnostics {
        eprintln!("{}", msg.render(&template, &settings.colors));
        worst = Some(match worst {
            Some(w) => w.min(msg.severity),
            None => msg.severity,
        });
    }
    if show_time {
        eprintln!("elapsed: {:?}", start.elapsed());
    }
    match worst {
        Some(Severity::Error) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("cannot read '{path}': {err}"))
}
