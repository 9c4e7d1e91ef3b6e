// ============================================================================
// GridPaint Scripting: Rhai-based sandboxed session driver
// ============================================================================
//
// Scripts drive a live `Session` the way a user at the canvas would: paint
// strokes, trigger special mode, undo, redo, resize the brush. Everything a
// script does is recorded in the session's undo history and replay log.

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Position, Scope};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::canvas::WHITE;
use crate::layers::Layer;
use crate::project::Session;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|l| *l > 0),
            column: pos.position().filter(|c| *c > 0),
        }
    }

    /// Error explanation with line context and a hint for the common cases.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let mut parts = Vec::new();

        match self.line {
            Some(line) => parts.push(format!("Error on line {}:", line)),
            None => parts.push("Script error:".to_string()),
        }

        let cleaned = raw.split(" (line ").next().unwrap_or(raw);
        parts.push(format!("  {}", cleaned));

        if raw.contains("unknown layer") {
            let names: Vec<&str> = Layer::all().iter().map(|l| l.name()).collect();
            parts.push(String::new());
            parts.push(format!("  Tip: available layers are {}.", names.join(", ")));
        } else if raw.contains("Function not found:") {
            parts.push(String::new());
            parts.push(
                "  Tip: coordinates are integers, e.g. draw(\"black\", 3, 4);".to_string(),
            );
        } else if raw.contains("Too many operations") {
            parts.push(String::new());
            parts.push("  Tip: the script may contain an infinite loop.".to_string());
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

/// Result of a successful script run.
pub struct ScriptOutcome {
    pub session: Session,
    pub console_output: Vec<String>,
    pub elapsed_ms: u64,
}

// ============================================================================
// Script context: shared mutable state between engine and host functions
// ============================================================================

struct ScriptContext {
    /// Taken back out once the script finishes.
    session: Option<Session>,
    console_output: Vec<String>,
}

type SharedContext = Arc<Mutex<ScriptContext>>;

fn with_session<R>(
    ctx: &SharedContext,
    f: impl FnOnce(&mut Session) -> R,
) -> Result<R, Box<EvalAltResult>> {
    let mut lock = ctx.lock().unwrap_or_else(|e| e.into_inner());
    match lock.session.as_mut() {
        Some(session) => Ok(f(session)),
        None => Err("session is closed".into()),
    }
}

fn coord(v: i64, what: &str) -> Result<usize, Box<EvalAltResult>> {
    usize::try_from(v).map_err(|_| format!("{} must be non-negative, got {}", what, v).into())
}

fn layer_named(name: &str) -> Result<Layer, Box<EvalAltResult>> {
    Layer::from_name(name).ok_or_else(|| format!("unknown layer '{}'", name).into())
}

// ============================================================================
// Engine construction with sandbox + API registration
// ============================================================================

/// Create a new sandboxed Rhai engine with the session API registered.
fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(5_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(1_000);

    let c = ctx.clone();
    engine.on_print(move |s| {
        let mut lock = c.lock().unwrap_or_else(|e| e.into_inner());
        lock.console_output.push(s.to_string());
    });

    register_grid_api(&mut engine, ctx.clone());
    register_edit_api(&mut engine, ctx);

    engine
}

// ============================================================================
// Grid info API
// ============================================================================

fn register_grid_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> Result<i64, Box<EvalAltResult>> {
        with_session(&c, |s| s.grid().width() as i64)
    });

    let c = ctx.clone();
    engine.register_fn("height", move || -> Result<i64, Box<EvalAltResult>> {
        with_session(&c, |s| s.grid().height() as i64)
    });

    let c = ctx.clone();
    engine.register_fn("brush_size", move || -> Result<i64, Box<EvalAltResult>> {
        with_session(&c, |s| s.grid().brush_size() as i64)
    });

    // color_at(x, y, t) -> [r, g, b] on a white background
    let c = ctx.clone();
    engine.register_fn(
        "color_at",
        move |x: i64, y: i64, t: i64| -> Result<Array, Box<EvalAltResult>> {
            let (x, y) = (coord(x, "x")?, coord(y, "y")?);
            let t = u64::try_from(t).unwrap_or(0);
            let color = with_session(&c, |s| s.grid().color_at(x, y, WHITE, t))?
                .ok_or_else(|| -> Box<EvalAltResult> {
                    format!("cell ({}, {}) is outside the grid", x, y).into()
                })?;
            Ok(color.0.iter().map(|v| Dynamic::from(*v as i64)).collect())
        },
    );

    // layers(x, y) -> layer names in composition order
    let c = ctx;
    engine.register_fn(
        "layers",
        move |x: i64, y: i64| -> Result<Array, Box<EvalAltResult>> {
            let (x, y) = (coord(x, "x")?, coord(y, "y")?);
            let names = with_session(&c, |s| {
                s.grid()
                    .cell(x, y)
                    .map(|cell| cell.layers().iter().map(|l| l.name()).collect::<Vec<_>>())
            })?
            .ok_or_else(|| -> Box<EvalAltResult> {
                format!("cell ({}, {}) is outside the grid", x, y).into()
            })?;
            Ok(names.into_iter().map(|n| Dynamic::from(n.to_string())).collect())
        },
    );
}

// ============================================================================
// Editing API: everything here is recorded
// ============================================================================

fn register_edit_api(engine: &mut Engine, ctx: SharedContext) {
    // draw(layer, x, y) -> true if any cell changed
    let c = ctx.clone();
    engine.register_fn(
        "draw",
        move |name: ImmutableString, x: i64, y: i64| -> Result<bool, Box<EvalAltResult>> {
            let layer = layer_named(name.as_str())?;
            let (x, y) = (coord(x, "x")?, coord(y, "y")?);
            with_session(&c, |s| s.paint(layer, x, y))
        },
    );

    let c = ctx.clone();
    engine.register_fn("special", move || -> Result<(), Box<EvalAltResult>> {
        with_session(&c, |s| s.special())
    });

    let c = ctx.clone();
    engine.register_fn("undo", move || -> Result<bool, Box<EvalAltResult>> {
        with_session(&c, |s| s.undo())
    });

    let c = ctx.clone();
    engine.register_fn("redo", move || -> Result<bool, Box<EvalAltResult>> {
        with_session(&c, |s| s.redo())
    });

    let c = ctx.clone();
    engine.register_fn("brush_up", move || -> Result<(), Box<EvalAltResult>> {
        with_session(&c, |s| s.increase_brush_size())
    });

    let c = ctx;
    engine.register_fn("brush_down", move || -> Result<(), Box<EvalAltResult>> {
        with_session(&c, |s| s.decrease_brush_size())
    });
}

// ============================================================================
// Entry point
// ============================================================================

/// Run `source` against `session` on the current thread.
pub fn execute_script_sync(source: &str, session: Session) -> Result<ScriptOutcome, ScriptError> {
    let start = Instant::now();
    let ctx = Arc::new(Mutex::new(ScriptContext {
        session: Some(session),
        console_output: Vec::new(),
    }));

    let engine = create_engine(ctx.clone());
    let mut scope = Scope::new();

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;

    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;

    drop(engine);
    let mut lock = ctx.lock().unwrap_or_else(|e| e.into_inner());
    let session = lock.session.take().ok_or_else(|| ScriptError {
        message: "session was lost during script execution".to_string(),
        line: None,
        column: None,
    })?;
    Ok(ScriptOutcome {
        session,
        console_output: std::mem::take(&mut lock.console_output),
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawStyle, GridConfig};
    use crate::components::history::HistoryConfig;

    fn session(style: DrawStyle) -> Session {
        Session::new(GridConfig::new(style, 6, 6), HistoryConfig::default())
    }

    #[test]
    fn script_drives_session() {
        let src = r#"
            draw("black", 2, 2);
            brush_down();
            draw("lighten", 0, 0);
            special();
            undo();
            print(`brush ${brush_size()}`);
        "#;
        let out = execute_script_sync(src, session(DrawStyle::Additive)).unwrap();
        assert_eq!(out.console_output, vec!["brush 1".to_string()]);
        assert_eq!(out.session.history().undo_count(), 2);
        assert_eq!(out.session.replay_log().len(), 4);
    }

    #[test]
    fn script_reads_colors_and_layers() {
        let src = r#"
            draw("red", 1, 1);
            let c = color_at(1, 1, 0);
            let l = layers(1, 1);
            print(`${c[0]},${c[1]},${c[2]} ${l[0]}`);
        "#;
        let out = execute_script_sync(src, session(DrawStyle::Sequence)).unwrap();
        assert_eq!(out.console_output, vec!["255,255,255 red".to_string()]);
    }

    #[test]
    fn unknown_layer_is_reported() {
        let src = "draw(\"black\", 0, 0);\ndraw(\"glitter\", 1, 1);";
        let err = execute_script_sync(src, session(DrawStyle::Set)).err().unwrap();
        assert!(err.message.contains("unknown layer"));
        assert!(err.friendly_message().contains("available layers"));
    }

    #[test]
    fn negative_coordinates_are_rejected() {
        let err = execute_script_sync("draw(\"black\", -1, 0);", session(DrawStyle::Set))
            .err()
            .unwrap();
        assert!(err.message.contains("non-negative"));
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = execute_script_sync("draw(\"black\", 0, ", session(DrawStyle::Set))
            .err()
            .unwrap();
        assert!(err.line.is_some());
    }
}
