//! Line-oriented session host
//!
//! Reads commands line by line:
//!
//! - `%snowauth [options]` authenticates
//! - `%%snowsql [var]` starts a SQL cell that runs until the first empty line
//!   or end of input
//! - `%who` lists bound variables
//! - a bound variable name renders its table
//! - `exit` / `quit` ends the session

use std::io::{self, BufRead, Write};

use magics::connection::Connector;
use magics::extension::{AUTH_COMMAND, SQL_COMMAND};
use magics::{Session, Shell, SnowflakeMagics};

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// One parsed input line
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Auth(&'a str),
    Sql(&'a str),
    Who,
    Exit,
    Blank,
    Other(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Blank;
    }
    if let Some(rest) = trimmed.strip_prefix("%%").and_then(|r| r.strip_prefix(SQL_COMMAND)) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Command::Sql(rest.trim());
        }
    }
    if let Some(rest) = trimmed.strip_prefix('%').and_then(|r| r.strip_prefix(AUTH_COMMAND)) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Command::Auth(rest.trim());
        }
    }
    match trimmed {
        "%who" => Command::Who,
        "exit" | "quit" => Command::Exit,
        other => Command::Other(other),
    }
}

/// Interactive host for the magics
pub struct Repl<C: Connector, W: Write> {
    magics: SnowflakeMagics<C>,
    session: Session<W>,
    env: EnvLookup,
}

impl<C: Connector, W: Write> Repl<C, W> {
    pub fn new(magics: SnowflakeMagics<C>, session: Session<W>) -> Self {
        Self {
            magics,
            session,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment lookup used by `%snowauth`
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        self.env = Box::new(env);
        self
    }

    pub fn session(&self) -> &Session<W> {
        &self.session
    }

    #[cfg(test)]
    pub fn session_mut(&mut self) -> &mut Session<W> {
        &mut self.session
    }

    /// Run until `exit` or end of input
    pub fn run<R: BufRead>(&mut self, input: R, interactive: bool) -> io::Result<()> {
        let mut lines = input.lines();

        loop {
            if interactive {
                prompt("snowsql> ")?;
            }
            let Some(line) = lines.next().transpose()? else {
                break;
            };

            match parse_command(&line) {
                Command::Blank => {}
                Command::Exit => break,
                Command::Auth(args) => {
                    let env = &self.env;
                    self.magics
                        .snowauth_with_env(args, &mut self.session, |name| env(name));
                }
                Command::Sql(args) => {
                    let args = args.to_string();
                    let mut cell = String::new();
                    loop {
                        if interactive {
                            prompt("     ...> ")?;
                        }
                        match lines.next().transpose()? {
                            Some(line) if !line.trim().is_empty() => {
                                cell.push_str(&line);
                                cell.push('\n');
                            }
                            _ => break,
                        }
                    }
                    tracing::debug!("Running cell of {} bytes", cell.len());
                    self.magics.snowsql(&args, &cell, &mut self.session);
                }
                Command::Who => self.who(),
                Command::Other(text) => self.show(text),
            }
        }
        Ok(())
    }

    fn who(&mut self) {
        let names: Vec<String> = self.session.variables().map(str::to_string).collect();
        if names.is_empty() {
            self.session.print("Interactive namespace is empty.");
        } else {
            self.session.print(&names.join("\t"));
        }
    }

    fn show(&mut self, text: &str) {
        match self.session.get(text).cloned() {
            Some(table) => self.session.display(&table),
            None => self.session.print(&format!(
                "Unknown input '{}'. Use %{}, %%{} [var], %who or a bound variable name.",
                text, AUTH_COMMAND, SQL_COMMAND
            )),
        }
    }
}

fn prompt(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", text)?;
    stdout.flush()
}
