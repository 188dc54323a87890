//! Command execution capability handed to every session.
//!
//! The RCON engine never interprets commands itself. It splits the request
//! body into a name and arguments and asks a [`CommandExecutor`] for a status
//! text, acting as the console [`Caller`].

use std::fmt;

/// Who is asking for a command to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    Console,
    Player,
}

impl fmt::Display for CallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerKind::Console => f.write_str("console"),
            CallerKind::Player => f.write_str("player"),
        }
    }
}

/// Identity a command runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub kind: CallerKind,
    pub role: String,
    pub privileges: Vec<String>,
}

impl Caller {
    /// Wildcard privilege granting everything
    pub const ALL_PRIVILEGES: &'static str = "*";

    /// The synthetic console identity RCON commands run as
    pub fn console() -> Self {
        Self {
            kind: CallerKind::Console,
            role: "admin".to_string(),
            privileges: vec![Self::ALL_PRIVILEGES.to_string()],
        }
    }

    pub fn has_privilege(&self, privilege: &str) -> bool {
        self.privileges
            .iter()
            .any(|p| p == Self::ALL_PRIVILEGES || p == privilege)
    }
}

/// Host capability that runs a command and reports its status text.
///
/// Implementations must always return a string, possibly empty. They are
/// called from the blocking thread pool, so they may block.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(&self, command: &str, args: &[String], caller: &Caller) -> String;
}

impl<F> CommandExecutor for F
where
    F: Fn(&str, &[String], &Caller) -> String + Send + Sync + 'static,
{
    fn execute(&self, command: &str, args: &[String], caller: &Caller) -> String {
        self(command, args, caller)
    }
}

/// A command line split on whitespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split `body` into a command name and arguments.
    ///
    /// Whitespace-only input still yields a line, with an empty name; the
    /// executor decides what that means.
    pub fn parse(body: &str) -> Self {
        let mut tokens = body.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        Self {
            name,
            args: tokens.map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
