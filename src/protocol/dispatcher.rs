use crate::protocol::executor::{Caller, CommandExecutor};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

type HandlerFn = dyn Fn(&[String], &Caller) -> String + Send + Sync + 'static;

/// Name-routed command table for hosts without a command system of their own.
///
/// Names are matched case-insensitively. An optional privilege can be attached
/// to each command; callers lacking it get a refusal text instead of a run.
pub struct CommandRegistry {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Registered>>>,
}

struct Registered {
    privilege: Option<String>,
    handler: Box<HandlerFn>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(&[String], &Caller) -> String + Send + Sync + 'static,
    {
        self.insert(name, None, Box::new(handler));
    }

    /// Register a command that requires `privilege`
    pub fn register_privileged<F>(&self, name: &str, privilege: &str, handler: F)
    where
        F: Fn(&[String], &Caller) -> String + Send + Sync + 'static,
    {
        self.insert(name, Some(privilege.to_string()), Box::new(handler));
    }

    fn insert(&self, name: &str, privilege: Option<String>, handler: Box<HandlerFn>) {
        // A poisoned lock only means a handler panicked mid-insert; the map is still usable
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.insert(
            Cow::Owned(name.to_ascii_lowercase()),
            Registered { privilege, handler },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .map(|h| h.contains_key(name.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .map(|h| h.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn dispatch(&self, name: &str, args: &[String], caller: &Caller) -> String {
        let key = normalize(name);

        let handlers = match self.handlers.read() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };

        match handlers.get(&*key) {
            Some(entry) => {
                if let Some(privilege) = &entry.privilege {
                    if !caller.has_privilege(privilege) {
                        warn!(command = %key, caller = %caller.kind, "Caller lacks privilege");
                        return format!("Insufficient privileges to run /{key}");
                    }
                }
                debug!(command = %key, args = args.len(), "Dispatching command");
                (entry.handler)(args, caller)
            }
            None => format!("Unknown command /{key}"),
        }
    }
}

impl CommandExecutor for CommandRegistry {
    fn execute(&self, command: &str, args: &[String], caller: &Caller) -> String {
        self.dispatch(command, args, caller)
    }
}

/// Lower-case the name only when needed (zero-copy for the common case).
#[inline]
fn normalize(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}
