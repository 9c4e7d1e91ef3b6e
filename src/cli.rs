// ============================================================================
// GridPaint CLI: headless sessions driven by Rhai scripts
// ============================================================================
//
// Usage examples:
//   gridpaint --input strokes.rhai --style sequence --dump
//   gridpaint -i demos/*.rhai --style add --log-dir logs/ --verify
//   gridpaint -i one.rhai --width 32 --height 8 --save-log one.gpl
//   gridpaint --replay-log one.gpl --dump -t 12
//
// Each script runs against its own fresh session. Everything it does is
// recorded, so the session can be saved as an action log and replayed later.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{DrawStyle, Grid, GridConfig, WHITE};
use crate::components::history::HistoryConfig;
use crate::io::{load_action_log, save_action_log};
use crate::ops::scripting::execute_script_sync;
use crate::project::Session;
use crate::{log_err, log_info, logger};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// GridPaint headless session runner.
#[derive(Parser, Debug)]
#[command(
    name = "gridpaint",
    about = "GridPaint headless layer-grid painter",
    long_about = "Run Rhai scripts that paint on a grid of layered cells, record every\n\
                  action, and replay recorded sessions.\n\n\
                  Example:\n  \
                  gridpaint --input strokes.rhai --style sequence --dump\n  \
                  gridpaint --replay-log strokes.gpl --dump"
)]
pub struct CliArgs {
    /// Script file(s) to run. Glob patterns accepted (e.g. "demos/*.rhai").
    #[arg(short, long, num_args = 1.., required_unless_present = "replay_log")]
    pub input: Vec<String>,

    /// Drawing style for new sessions: set, additive (add), sequence (seq).
    #[arg(long, default_value = "set", value_name = "STYLE")]
    pub style: String,

    /// Grid width in cells.
    #[arg(long, default_value_t = 16)]
    pub width: usize,

    /// Grid height in cells.
    #[arg(long, default_value_t = 16)]
    pub height: usize,

    /// Initial brush size (clamped to the brush limits).
    #[arg(long, value_name = "N")]
    pub brush: Option<usize>,

    /// Replay a saved action log instead of running scripts.
    #[arg(long, value_name = "FILE", conflicts_with = "input")]
    pub replay_log: Option<PathBuf>,

    /// Save the session's action log. Only valid for a single input.
    #[arg(long, value_name = "FILE")]
    pub save_log: Option<PathBuf>,

    /// Directory to save one action log per input script.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Replay each session on a fresh grid and check it matches the live grid.
    #[arg(long)]
    pub verify: bool,

    /// Print the final grid colours, one row per line.
    #[arg(long)]
    pub dump: bool,

    /// Timestamp used when rendering colours.
    #[arg(short, long, default_value_t = 0)]
    pub timestamp: u64,

    /// Print script console output and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more inputs failed.
pub fn run(args: CliArgs) -> ExitCode {
    if let Some(path) = &args.replay_log {
        return match run_replay(path, &args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {}", e);
                log_err!("CLI replay of {} failed: {}", path.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let grid_config = match grid_config_from(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.save_log.is_some() {
        eprintln!(
            "error: {} input files given but --save-log only accepts a single file path.\n\
             Use --log-dir to save one log per input.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    if let Some(dir) = &args.log_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create log directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        let log_path = build_log_path(
            input_path,
            args.save_log.as_deref(),
            args.log_dir.as_deref(),
        );

        match run_one(input_path, grid_config, log_path.as_deref(), &args) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  done ({:.0}ms)",
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("CLI run of {} failed: {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(
    input: &Path,
    grid_config: GridConfig,
    log_path: Option<&Path>,
    args: &CliArgs,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let source = std::fs::read_to_string(input)
        .map_err(|e| format!("could not read script: {}", e))?;

    // -- Step 2: Run -----------------------------------------------------
    let session = Session::new(grid_config, HistoryConfig::default());
    logger::set_session(Some(&session.id));
    let result = execute_script_sync(&source, session);
    logger::set_session(None);
    let outcome = result.map_err(|e| format!("script error: {}", e.friendly_message()))?;

    if args.verbose {
        for line in &outcome.console_output {
            println!("  [script] {}", line);
        }
        println!(
            "  {} action(s) recorded in {}ms",
            outcome.session.replay_log().len(),
            outcome.elapsed_ms
        );
    }
    let mut session = outcome.session;

    // -- Step 3: Save log (optional) -------------------------------------
    if let Some(path) = log_path {
        save_action_log(session.grid_config(), session.replay_log(), path)
            .map_err(|e| format!("log save failed: {}", e))?;
        if args.verbose {
            println!("  → {}", path.display());
        }
    }

    if args.dump {
        print_grid(session.grid(), args.timestamp);
    }

    // -- Step 4: Verify (optional) ---------------------------------------
    if args.verify {
        let live = session.grid().render(WHITE, args.timestamp);
        let mut target = session.fresh_grid();
        session.start_replay();
        while !session.replay_next(&mut target) {}
        if target.render(WHITE, args.timestamp) != live {
            return Err("replayed grid differs from the live grid".to_string());
        }
        log_info!("Session {} verified by replay", session.id);
        if args.verbose {
            println!("  replay verified");
        }
    }

    Ok(())
}

fn run_replay(path: &Path, args: &CliArgs) -> Result<(), String> {
    let log = load_action_log(path).map_err(|e| format!("log load failed: {}", e))?;
    let (config, mut replay) = log.into_tracker(HistoryConfig::default().replay_capacity);
    let mut grid = Grid::new(config);

    replay.start_replay();
    let played = replay.play_all(&mut grid);
    if args.verbose {
        println!(
            "{}: {} action(s) replayed on a {}×{} {} grid",
            path.display(),
            played,
            config.width,
            config.height,
            config.style.name()
        );
    }
    if args.dump {
        print_grid(&grid, args.timestamp);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn grid_config_from(args: &CliArgs) -> Result<GridConfig, String> {
    let style = DrawStyle::from_name(&args.style)
        .ok_or_else(|| format!("unknown style '{}' (expected set, additive or sequence)", args.style))?;
    let mut config = GridConfig::new(style, args.width, args.height);
    config.cell_count()?;
    if let Some(size) = args.brush {
        config.brush.default_size = size;
    }
    Ok(config)
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path: use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Where to write the action log for one input, if anywhere.
///
/// `--save-log` wins; otherwise `--log-dir` gets `<stem>.gpl`.
fn build_log_path(input: &Path, save_log: Option<&Path>, log_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = save_log {
        return Some(path.to_path_buf());
    }
    let dir = log_dir?;
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    Some(dir.join(format!("{}.gpl", stem)))
}

fn print_grid(grid: &Grid, timestamp: u64) {
    let colors = grid.render(WHITE, timestamp);
    for row in colors.chunks(grid.width()) {
        let line: Vec<String> = row
            .iter()
            .map(|c| format!("{},{},{}", c.0[0], c.0[1], c.0[2]))
            .collect();
        println!("{}", line.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("gridpaint").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_build_a_set_grid() {
        let args = parse(&["-i", "a.rhai"]);
        let config = grid_config_from(&args).unwrap();
        assert_eq!(config.style, DrawStyle::Set);
        assert_eq!((config.width, config.height), (16, 16));
    }

    #[test]
    fn style_and_brush_are_applied() {
        let args = parse(&["-i", "a.rhai", "--style", "seq", "--brush", "4", "--width", "3"]);
        let config = grid_config_from(&args).unwrap();
        assert_eq!(config.style, DrawStyle::Sequence);
        assert_eq!(config.brush.default_size, 4);
        assert_eq!(config.width, 3);
    }

    #[test]
    fn bad_style_and_empty_grid_are_rejected() {
        assert!(grid_config_from(&parse(&["-i", "a.rhai", "--style", "spray"])).is_err());
        assert!(grid_config_from(&parse(&["-i", "a.rhai", "--height", "0"])).is_err());
        let huge = parse(&["-i", "a.rhai", "--width", "8589934592", "--height", "2147483648"]);
        assert!(grid_config_from(&huge).is_err());
        let big = parse(&["-i", "a.rhai", "--width", "4096", "--height", "4096"]);
        assert!(grid_config_from(&big).is_err());
    }

    #[test]
    fn input_or_replay_log_is_required() {
        assert!(CliArgs::try_parse_from(["gridpaint"]).is_err());
        let args = parse(&["--replay-log", "x.gpl"]);
        assert!(args.input.is_empty());
    }

    #[test]
    fn log_path_prefers_explicit_file() {
        let input = Path::new("scripts/strokes.rhai");
        assert_eq!(
            build_log_path(input, Some(Path::new("out.gpl")), Some(Path::new("logs"))),
            Some(PathBuf::from("out.gpl"))
        );
        assert_eq!(
            build_log_path(input, None, Some(Path::new("logs"))),
            Some(Path::new("logs").join("strokes.gpl"))
        );
        assert_eq!(build_log_path(input, None, None), None);
    }
}
