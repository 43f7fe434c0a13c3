use thiserror::Error;

use crate::ast::Program;
use crate::interpreter::{ErrorCode, Interpreter, Namespace, ScriptError, Value};
use crate::modules::{BuildSpec, ModuleRecord, ModuleStore, ModuleTable};
use crate::parser::Parser;
use crate::render::Highlighter;
use crate::tokenizer::Tokenizer;

/// Command-layer diagnostics. These are always handled locally: printed and
/// forgotten, with no registry state touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: mod build name [in parent_package]")]
    BuildUsage,
    #[error("usage: mod list\n       mod show mod_name\n       mod build name [in parent_package]")]
    Usage,
    #[error("no module named {0}")]
    NotFound(String),
    #[error("mod end outside of a build cell")]
    StrayEnd,
}

/// Result of feeding one line (or one full build) to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// Inside a build cell; the line was buffered.
    Pending,
    /// Executed with nothing to echo.
    Quiet,
    /// Expression value to echo back.
    Value(Value),
    /// A module build completed.
    Built { full_name: String },
    /// Registered full names, first-build order.
    Listing(Vec<String>),
    /// Rendered module source for display.
    Rendered(String),
    /// A command-layer diagnostic to print.
    Diagnostic(CommandError),
}

struct PendingCell {
    tokens: Vec<String>,
    lines: Vec<String>,
}

/// One interactive pad session: the module registry, the shell namespace,
/// and the interpreter driving both.
///
/// All state is session-local and injected into the interpreter by handle;
/// nothing lives in process globals.
pub struct PadSession {
    interpreter: Interpreter,
    table: ModuleTable,
    store: ModuleStore,
    shell: Namespace,
    highlighter: Highlighter,
    pending: Option<PendingCell>,
    trace: bool,
}

impl PadSession {
    pub fn new(color: bool) -> Self {
        let table = ModuleTable::new();
        let interpreter = Interpreter::with_modules(table.clone());
        Self {
            interpreter,
            table,
            store: ModuleStore::new(),
            shell: Namespace::new(),
            highlighter: Highlighter::new(color),
            pending: None,
            trace: false,
        }
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    /// True while the session is collecting the body of a build cell.
    pub fn in_cell(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle onto the session's module table.
    pub fn table(&self) -> ModuleTable {
        self.table.clone()
    }

    /// Handle onto the shell namespace fragments execute in.
    pub fn shell(&self) -> Namespace {
        self.shell.clone()
    }

    pub fn store(&self) -> &ModuleStore {
        &self.store
    }

    /// Feed one input line: a `mod` command, a build-cell body line, or a
    /// script fragment for the shell namespace.
    pub fn feed(&mut self, line: &str) -> Result<CellOutcome, ScriptError> {
        if self.in_cell() {
            if line.trim() == "mod end" {
                if let Some(cell) = self.pending.take() {
                    let tokens: Vec<&str> = cell.tokens.iter().map(String::as_str).collect();
                    let mut body = cell.lines.join("\n");
                    body.push('\n');
                    return self.build(&tokens, &body);
                }
            }
            if let Some(cell) = self.pending.as_mut() {
                cell.lines.push(line.to_string());
            }
            return Ok(CellOutcome::Pending);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(CellOutcome::Quiet);
        }

        let mut words = trimmed.split_whitespace();
        if words.next() == Some("mod") {
            let rest: Vec<&str> = words.collect();
            return Ok(self.dispatch_command(&rest));
        }

        self.eval(line)
    }

    fn dispatch_command(&mut self, tokens: &[&str]) -> CellOutcome {
        match tokens {
            ["list"] => CellOutcome::Listing(self.store.names()),
            ["show", name] => self.show(name),
            ["build", spec @ ..] => match BuildSpec::parse(spec) {
                Some(_) => {
                    self.pending = Some(PendingCell {
                        tokens: spec.iter().map(|t| (*t).to_string()).collect(),
                        lines: Vec::new(),
                    });
                    CellOutcome::Pending
                }
                None => CellOutcome::Diagnostic(CommandError::BuildUsage),
            },
            ["end"] => CellOutcome::Diagnostic(CommandError::StrayEnd),
            _ => CellOutcome::Diagnostic(CommandError::Usage),
        }
    }

    /// Execute a script fragment in the shell namespace.
    pub fn eval(&mut self, source: &str) -> Result<CellOutcome, ScriptError> {
        let program = compile(source)?;
        match self.interpreter.eval_fragment(&self.shell, &program)? {
            Some(value) => Ok(CellOutcome::Value(value)),
            None => Ok(CellOutcome::Quiet),
        }
    }

    /// Build (or incrementally rebuild) a module from a cell body.
    ///
    /// The pipeline order is fixed: resolve the spec, append or create the
    /// record, execute only the new fragment against the record's namespace,
    /// then register in the store and table, link ancestors, and expose to
    /// the shell. An execution failure surfaces as a `ScriptError`; for an
    /// existing module the appended source stays appended (no rollback), a
    /// brand-new module is discarded before registration.
    pub fn build(&mut self, tokens: &[&str], cell: &str) -> Result<CellOutcome, ScriptError> {
        let Some(spec) = BuildSpec::parse(tokens) else {
            return Ok(CellOutcome::Diagnostic(CommandError::BuildUsage));
        };
        let build_line = spec.build_line();

        let existing = match self.store.get_mut(&spec.full_name) {
            Some(record) => {
                record.source.push_str(cell);
                record.build_line = build_line.clone();
                Some(record.namespace.clone())
            }
            None => None,
        };
        let is_new = existing.is_none();
        if !is_new {
            self.trace_event(&format!(
                "append {} (+{} bytes)",
                spec.full_name,
                cell.len()
            ));
        }
        let namespace = existing.unwrap_or_default();

        let program = compile(cell)?;
        self.interpreter.eval_fragment(&namespace, &program)?;

        if is_new {
            self.trace_event(&format!("create {}", spec.full_name));
            self.store.insert(ModuleRecord {
                full_name: spec.full_name.clone(),
                namespace: namespace.clone(),
                source: cell.to_string(),
                build_line,
            });
        }

        self.table.bind(&spec.full_name, namespace.clone());
        self.trace_event(&format!("bind {}", spec.full_name));
        self.table.link_ancestors(&spec.full_name);
        self.trace_event(&format!("link {}", spec.full_name));
        self.expose(&spec, namespace);

        Ok(CellOutcome::Built {
            full_name: spec.full_name,
        })
    }

    /// Push the built module into the shell namespace: the leaf identifier
    /// always, plus the top-level package when it differs.
    fn expose(&self, spec: &BuildSpec, namespace: Namespace) {
        self.shell.set(&spec.leaf, Value::Module(namespace));
        let top = spec.top_level();
        if top != spec.leaf {
            if let Some(top_ns) = self.table.lookup(top) {
                self.shell.set(top, Value::Module(top_ns));
            }
        }
        self.trace_event(&format!("expose {}", spec.leaf));
    }

    fn show(&self, query: &str) -> CellOutcome {
        match self.store.find(query) {
            Some(record) => CellOutcome::Rendered(
                self.highlighter
                    .render_cell(&record.build_line, &record.source),
            ),
            None => CellOutcome::Diagnostic(CommandError::NotFound(query.to_string())),
        }
    }

    fn trace_event(&self, message: &str) {
        if self.trace {
            eprintln!("[trace] {}", message);
        }
    }
}

impl Default for PadSession {
    fn default() -> Self {
        Self::new(false)
    }
}

fn compile(source: &str) -> Result<Program, ScriptError> {
    let mut tokenizer = Tokenizer::new(source);
    let tokens = tokenizer
        .tokenize()
        .map_err(|err| ScriptError::new(ErrorCode::Syntax, err))?;
    let mut parser = Parser::new(tokens);
    parser.parse().map_err(ScriptError::from)
}
