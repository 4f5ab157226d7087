//! Core console state and execution.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use sqlbook_core::messages;
use sqlbook_lexer::{split_dotted_name, LexerState, StatementLexer};
use sqlbook_session::{QuerySession, SessionError, SessionState};
use sqlbook_source::DataSource;
use tracing::debug;

use crate::format::{help_text, render_table};

const PROMPT: &str = "sql> ";
const CONTINUATION_PROMPT: &str = ">>> ";
const PAGE_PROMPT: &str = "Enter to continue, or q to quit";

/// Console commands recognised at the start of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Quit,
    Help,
    Tables,
    Views,
    Describe(String),
}

/// Recognise a meta-command line.
pub fn parse_meta(line: &str) -> Option<MetaCommand> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "quit;" | "quit" | "exit" | "\\q" => return Some(MetaCommand::Quit),
        "help" | "\\h" => return Some(MetaCommand::Help),
        "\\dt" => return Some(MetaCommand::Tables),
        "\\dv" => return Some(MetaCommand::Views),
        _ => {}
    }
    trimmed
        .strip_prefix("\\d ")
        .map(|name| MetaCommand::Describe(name.trim().to_string()))
}

/// Where rendered pages go, and whether to fetch another one.
trait Pager {
    fn emit(&mut self, text: &str) -> io::Result<()>;

    fn more(&mut self) -> io::Result<bool>;
}

/// Collects every page without asking.
struct Collect<'a> {
    out: &'a mut String,
}

impl Pager for Collect<'_> {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        self.out.push_str(text);
        Ok(())
    }

    fn more(&mut self) -> io::Result<bool> {
        Ok(true)
    }
}

/// Writes pages as they arrive and asks between full pages.
struct Prompting<'a, R, W> {
    input: &'a mut R,
    out: &'a mut W,
}

impl<R: BufRead, W: Write> Pager for Prompting<'_, R, W> {
    fn emit(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    fn more(&mut self) -> io::Result<bool> {
        write!(self.out, "{}", PAGE_PROMPT)?;
        self.out.flush()?;
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        Ok(answer.trim() != "q")
    }
}

/// Outcome of reading one statement.
enum Statement {
    Complete(String),
    Malformed,
    Meta(MetaCommand),
    Eof,
}

/// Console state.
pub struct Repl<S: DataSource> {
    session: QuerySession<S>,
}

impl<S: DataSource> Repl<S> {
    /// Create a console over a session.
    pub fn new(session: QuerySession<S>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &QuerySession<S> {
        &self.session
    }

    /// Run one statement to completion and return everything it printed.
    pub fn execute(&mut self, sql: &str) -> Result<String, String> {
        let mut out = String::new();
        self.execute_paged(sql, &mut Collect { out: &mut out })?;
        Ok(out)
    }

    /// Run a meta-command and return its output. `Quit` produces nothing.
    pub fn run_meta(&mut self, command: &MetaCommand) -> Result<String, String> {
        match command {
            MetaCommand::Quit => Ok(String::new()),
            MetaCommand::Help => Ok(format!("{}\n", help_text())),
            MetaCommand::Tables => {
                let tables = self.session.tables().map_err(provider_error)?;
                Ok(list_names(tables.iter().map(|t| t.qualified_name()), "tables"))
            }
            MetaCommand::Views => {
                let views = self.session.views().map_err(provider_error)?;
                Ok(list_names(views.iter().map(|v| v.qualified_name()), "views"))
            }
            MetaCommand::Describe(name) => {
                let parts = split_dotted_name(name);
                let (catalog, schema, table) = match parts.as_slice() {
                    [table] => (None, None, table),
                    [schema, table] => (None, Some(schema.as_str()), table),
                    [catalog, schema, table] => {
                        (Some(catalog.as_str()), Some(schema.as_str()), table)
                    }
                    _ => return Err(format!("Invalid name: {}", name)),
                };
                let columns = self
                    .session
                    .columns(catalog, schema, Some(table.as_str()))
                    .map_err(provider_error)?;
                if columns.is_empty() {
                    return Ok(format!("No columns found for {}\n", name));
                }
                Ok(columns
                    .iter()
                    .map(|c| format!("{} :: {}\n", c.column, c.datatype))
                    .collect())
            }
        }
    }

    /// Load and run a script file.
    pub fn run_file(&mut self, path: &Path) -> Result<(), String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
        debug!(path = %path.display(), "running script");
        self.run_script(&content)
    }

    /// Run scripts in order, stopping at the first one that fails.
    pub fn run_files(&mut self, paths: &[PathBuf]) -> Result<(), String> {
        for path in paths {
            self.run_file(path)
                .map_err(|e| format!("Error loading {}: {}", path.display(), e))?;
        }
        Ok(())
    }

    /// Run a script, printing every page without prompting.
    pub fn run_script(&mut self, content: &str) -> Result<(), String> {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.run(
            content.as_bytes(),
            &mut stdout.lock(),
            &mut stderr.lock(),
            false,
        )
        .map_err(|e| format!("I/O error: {}", e))
    }

    /// Run the interactive loop on the terminal.
    pub fn interactive(&mut self) -> io::Result<()> {
        println!("SQLBook v{}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for commands, 'quit' to exit");
        println!();

        let stdin = io::stdin();
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.run(stdin.lock(), &mut stdout.lock(), &mut stderr.lock(), true)?;
        println!("Goodbye!");
        Ok(())
    }

    /// Read statements from `input` until it ends or a quit command.
    ///
    /// Results go to `out` and errors to `err`. When `interactive` is set,
    /// prompts are written and long results stop between pages.
    pub fn run<R, W, E>(
        &mut self,
        mut input: R,
        out: &mut W,
        err: &mut E,
        interactive: bool,
    ) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        loop {
            let statement = read_statement(&mut input, out, interactive)?;
            let result = match statement {
                Statement::Eof | Statement::Meta(MetaCommand::Quit) => break,
                Statement::Malformed => {
                    writeln!(err, "{}", messages::ERR_COULD_NOT_PARSE)?;
                    continue;
                }
                Statement::Meta(command) => self.run_meta(&command).and_then(|text| {
                    write!(out, "{}", text).map_err(|e| e.to_string())
                }),
                Statement::Complete(sql) if interactive => self.execute_paged(
                    &sql,
                    &mut Prompting {
                        input: &mut input,
                        out: &mut *out,
                    },
                ),
                Statement::Complete(sql) => self.execute(&sql).and_then(|text| {
                    write!(out, "{}", text).map_err(|e| e.to_string())
                }),
            };
            if let Err(message) = result {
                writeln!(err, "{}", message)?;
            }
            out.flush()?;
        }
        Ok(())
    }

    /// Run a statement, hand its pages to `pager`, and always finish it.
    fn execute_paged(&mut self, sql: &str, pager: &mut dyn Pager) -> Result<(), String> {
        self.session.execute(sql).map_err(provider_error)?;
        let shown = self.show_result(pager);
        if self.session.state() == SessionState::QueryOpen {
            let finished = self.session.finish().map_err(provider_error);
            shown?;
            return finished;
        }
        shown
    }

    fn show_result(&mut self, pager: &mut dyn Pager) -> Result<(), String> {
        let columns = self.session.metadata().map_err(provider_error)?.to_vec();
        if columns.is_empty() {
            let count = self.session.count().map_err(provider_error)?;
            return pager
                .emit(&format!("{} records affected\n", count))
                .map_err(|e| e.to_string());
        }

        let page_size = self.session.config().max_page_size();
        let mut first = true;
        loop {
            let page = self.session.page_default().map_err(provider_error)?;
            if page.is_empty() && !first {
                return Ok(());
            }
            first = false;
            pager
                .emit(&render_table(&columns, &page))
                .map_err(|e| e.to_string())?;
            if page.len() < page_size || !pager.more().map_err(|e| e.to_string())? {
                return Ok(());
            }
        }
    }
}

fn read_statement<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    interactive: bool,
) -> io::Result<Statement> {
    let mut lexer = StatementLexer::new();
    let mut buffer = String::new();

    loop {
        if interactive {
            let prompt = if buffer.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };
            write!(out, "{}", prompt)?;
            out.flush()?;
        }

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            if !buffer.trim().is_empty() {
                debug!("input ended inside a statement");
            }
            return Ok(Statement::Eof);
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }

        if buffer.trim().is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(command) = parse_meta(&line) {
                return Ok(Statement::Meta(command));
            }
        }

        buffer.push_str(&line);
        lexer.feed(&line);
        match lexer.state() {
            LexerState::Complete => return Ok(Statement::Complete(buffer.trim().to_string())),
            LexerState::Error => return Ok(Statement::Malformed),
            _ => {}
        }
    }
}

fn list_names(names: impl Iterator<Item = String>, what: &str) -> String {
    let lines: Vec<String> = names.map(|name| format!("{}\n", name)).collect();
    if lines.is_empty() {
        format!("(no {})\n", what)
    } else {
        lines.concat()
    }
}

fn provider_error(err: SessionError) -> String {
    format!("Error from provider: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlbook_core::{TableMetadata, Value};
    use sqlbook_session::SessionConfig;
    use sqlbook_source::{MemoryProbe, MemorySource};

    fn numbers(n: i64) -> Vec<Vec<Value>> {
        (1..=n).map(|i| vec![Value::Integer(i)]).collect()
    }

    fn repl(page_size: usize) -> (Repl<MemorySource>, MemoryProbe) {
        let source = MemorySource::new()
            .with_result_set("SELECT n FROM numbers", &[("n", "INTEGER")], numbers(5))
            .with_update("DELETE FROM numbers", 5)
            .with_failure("SELECT * FROM missing", "no such table: missing")
            .with_failing_result_set("SELECT flaky", &[("n", "INTEGER")], numbers(5), 1)
            .with_table(
                TableMetadata::new("main", "", "numbers"),
                &[("n", "INTEGER")],
            )
            .with_view(TableMetadata::new("main", "", "evens"), &[("n", "INTEGER")]);
        let probe = source.probe();
        let config = SessionConfig::new(page_size).unwrap();
        (Repl::new(QuerySession::with_config(source, config)), probe)
    }

    fn run(repl: &mut Repl<MemorySource>, input: &str, interactive: bool) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        repl.run(input.as_bytes(), &mut out, &mut err, interactive)
            .unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_parse_meta_commands() {
        assert_eq!(parse_meta("quit;"), Some(MetaCommand::Quit));
        assert_eq!(parse_meta("  \\q "), Some(MetaCommand::Quit));
        assert_eq!(parse_meta("EXIT"), Some(MetaCommand::Quit));
        assert_eq!(parse_meta("\\h"), Some(MetaCommand::Help));
        assert_eq!(parse_meta("\\dt"), Some(MetaCommand::Tables));
        assert_eq!(parse_meta("\\dv"), Some(MetaCommand::Views));
        assert_eq!(
            parse_meta("\\d main.\"my table\""),
            Some(MetaCommand::Describe("main.\"my table\"".to_string()))
        );
        assert_eq!(parse_meta("SELECT 1;"), None);
    }

    #[test]
    fn test_execute_update_reports_count() {
        let (mut repl, probe) = repl(10);

        let output = repl.execute("DELETE FROM numbers;").unwrap();

        assert_eq!(output, "5 records affected\n");
        assert_eq!(repl.session().state(), SessionState::Idle);
        assert_eq!(probe.open_cursors(), 0);
    }

    #[test]
    fn test_execute_renders_every_page() {
        // GIVEN
        let (mut repl, _) = repl(2);

        // WHEN
        let output = repl.execute("SELECT n FROM numbers").unwrap();

        // THEN
        let data_lines: Vec<&str> = output
            .lines()
            .filter(|line| line.chars().all(|c| c.is_ascii_digit()) && !line.is_empty())
            .collect();
        assert_eq!(data_lines, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(output.matches("[INTEGER]").count(), 3);
        assert_eq!(repl.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_provider_error_is_reported() {
        let (mut repl, _) = repl(10);

        let err = repl.execute("SELECT * FROM missing").unwrap_err();

        assert_eq!(err, "Error from provider: query failed: no such table: missing");
        assert_eq!(repl.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_cursor_failure_still_leaves_session_idle() {
        let (mut repl, probe) = repl(10);

        let err = repl.execute("SELECT flaky").unwrap_err();

        assert!(err.starts_with("Error from provider:"));
        assert_eq!(repl.session().state(), SessionState::Idle);
        assert_eq!(probe.open_cursors(), 0);
    }

    #[test]
    fn test_script_joins_lines_until_complete() {
        // GIVEN
        let (mut repl, _) = repl(10);
        let script = "\n\nDELETE\nFROM numbers\n;\n";

        // WHEN
        let (out, err) = run(&mut repl, script, false);

        // THEN
        assert_eq!(out, "5 records affected\n");
        assert_eq!(err, "");
    }

    #[test]
    fn test_script_reports_malformed_statement_and_continues() {
        let (mut repl, _) = repl(10);

        let (out, err) = run(&mut repl, "SELECT n) FROM numbers;\nDELETE FROM numbers;\n", false);

        assert_eq!(err, "Could not parse SQL\n");
        assert_eq!(out, "5 records affected\n");
    }

    #[test]
    fn test_quit_stops_reading() {
        let (mut repl, probe) = repl(10);

        let (out, _) = run(&mut repl, "quit;\nDELETE FROM numbers;\n", false);

        assert_eq!(out, "");
        assert_eq!(probe.executions(), 0);
    }

    #[test]
    fn test_failed_script_returns_error_and_drop_closes_connection() {
        // GIVEN
        let (mut repl, probe) = repl(10);
        let missing = PathBuf::from("/nonexistent/sqlbook/setup.sql");

        // WHEN
        let err = repl.run_files(&[missing]).unwrap_err();
        drop(repl);

        // THEN
        assert!(err.starts_with("Error loading /nonexistent/sqlbook/setup.sql: Failed to read file"));
        assert_eq!(probe.executions(), 0);
        assert!(probe.is_closed());
    }

    #[test]
    fn test_interactive_prompts_and_paging() {
        // GIVEN
        let (mut repl, _) = repl(2);
        let input = "SELECT n\nFROM numbers;\n\nq\n";

        // WHEN
        let (out, _) = run(&mut repl, input, true);

        // THEN
        assert!(out.starts_with("sql> >>> "));
        assert_eq!(out.matches(PAGE_PROMPT).count(), 2);
        assert!(out.contains("\n3\n"));
        assert!(!out.contains("\n5\n"));
        assert!(out.ends_with("sql> "));
        assert_eq!(repl.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_catalog_meta_commands() {
        let (mut repl, _) = repl(10);

        let (out, _) = run(&mut repl, "\\dt\n\\dv\n\\d main..numbers\n", false);

        assert_eq!(out, "main.numbers\nmain.evens\nn :: INTEGER\n");
    }

    #[test]
    fn test_describe_rejects_overlong_names() {
        let (mut repl, _) = repl(10);
        let err = repl
            .run_meta(&MetaCommand::Describe("a.b.c.d".to_string()))
            .unwrap_err();
        assert_eq!(err, "Invalid name: a.b.c.d");
    }
}
