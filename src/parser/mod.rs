pub mod ast;

use crate::error::{ShellError, MAX_ARGS};
use crate::expansion::expand_pid;
use ast::*;

/// Background operator, recognised only as the final token.
const BACKGROUND: &str = "&";
const REDIRECT_IN: &str = "<";
const REDIRECT_OUT: &str = ">";

#[derive(Clone, Copy)]
enum Pending {
    Input,
    Output,
}

/// Turns one trimmed input line into a [`Statement`].
///
/// Tokens are split on the space character only. There is no quoting.
pub struct Parser {
    shell_pid: u32,
    foreground_only: bool,
}

impl Parser {
    pub fn new(shell_pid: u32, foreground_only: bool) -> Self {
        Self {
            shell_pid,
            foreground_only,
        }
    }

    pub fn parse(&self, line: &str) -> Result<Statement, ShellError> {
        if line.is_empty() {
            return Ok(Statement::Empty);
        }
        if line.starts_with('#') {
            return Ok(Statement::Comment);
        }
        // Built-ins take no arguments; a trailing " &" is ignored for them.
        match line.strip_suffix(" &").unwrap_or(line) {
            "exit" => return Ok(Statement::Exit),
            "status" => return Ok(Statement::Status),
            "cd" => return Ok(Statement::Cd(None)),
            _ => {}
        }

        let mut tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        let trailing_amp = tokens.last() == Some(&BACKGROUND);
        if trailing_amp {
            tokens.pop();
        }

        match tokens.first() {
            None => return Ok(Statement::Empty),
            Some(&"cd") => {
                let target = tokens.get(1).map(|t| self.expand(t));
                return Ok(Statement::Cd(target));
            }
            Some(_) => {}
        }

        let mut command = Command::default();
        let mut pending = None;
        for token in tokens {
            match token {
                REDIRECT_IN => pending = Some(Pending::Input),
                REDIRECT_OUT => pending = Some(Pending::Output),
                word => {
                    let word = self.expand(word);
                    match pending.take() {
                        Some(Pending::Input) => command.input = Some(word),
                        Some(Pending::Output) => command.output = Some(word),
                        None => {
                            if command.argv.len() == MAX_ARGS {
                                return Err(ShellError::TooManyArguments { limit: MAX_ARGS });
                            }
                            command.argv.push(word);
                        }
                    }
                }
            }
        }

        if command.argv.is_empty() {
            return Ok(Statement::Empty);
        }
        command.background = trailing_amp && !self.foreground_only;
        Ok(Statement::Command(command))
    }

    fn expand(&self, token: &str) -> String {
        expand_pid(token, self.shell_pid).into_owned()
    }
}
