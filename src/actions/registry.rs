//! # Action registry.
//!
//! Maps action names to handlers. A [`Registry`] is populated once and then
//! handed to the runner by value (usually inside an `Arc`); the runner only
//! reads it.
//!
//! A process-wide registry is also available through [`register`] and
//! [`global`], for programs that bind their actions during startup. All
//! registration must finish before the first journey runs; [`global`] returns
//! a snapshot.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::actions::builtin::{ClickUi, LockScreen, OpenUrl, UnlockScreen};
use crate::actions::{ActionContext, ActionFn, ActionRef, IntoOutcome};
use crate::error::RegistryError;
use crate::journey::Args;
use crate::session::SessionRef;

/// Name to handler map.
#[derive(Clone, Default)]
pub struct Registry {
    actions: HashMap<String, ActionRef>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `OpenUrl`, `LockScreen`, `UnlockScreen` and `ClickUI`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        let builtins: [ActionRef; 4] = [
            Arc::new(OpenUrl),
            Arc::new(LockScreen),
            Arc::new(UnlockScreen),
            Arc::new(ClickUi),
        ];
        for action in builtins {
            let name = action.name().to_string();
            reg.actions.insert(name, action);
        }
        reg
    }

    /// Binds `action` under its own name.
    ///
    /// Returns an error if the name is empty or already taken.
    pub fn register(&mut self, action: ActionRef) -> Result<(), RegistryError> {
        let name = action.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.actions.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        self.actions.insert(name, action);
        Ok(())
    }

    /// Binds a closure under `name`.
    ///
    /// # Example
    /// ```
    /// use cuj_runner::{ActionContext, ActionError, Args, Registry};
    /// use cuj_runner::session::SessionRef;
    ///
    /// let mut reg = Registry::new();
    /// reg.register_fn("Noop", |_c: ActionContext, _s: SessionRef, _a: Args| async {
    ///     Ok::<(), ActionError>(())
    /// })
    /// .unwrap();
    /// assert!(reg.contains("Noop"));
    /// ```
    pub fn register_fn<F, Fut, O>(&mut self, name: &'static str, f: F) -> Result<(), RegistryError>
    where
        F: Fn(ActionContext, SessionRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send,
        O: IntoOutcome + Send,
    {
        self.register(ActionFn::arc(name, f))
    }

    pub fn get(&self, name: &str) -> Option<ActionRef> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Adds every action of `other`; fails on the first name clash.
    pub fn merge(&mut self, other: &Registry) -> Result<(), RegistryError> {
        if let Some(name) = other.actions.keys().find(|n| self.actions.contains_key(*n)) {
            return Err(RegistryError::Duplicate { name: name.clone() });
        }
        self.actions
            .extend(other.actions.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.names())
            .finish()
    }
}

static GLOBAL: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::new()));

/// Binds `action` in the process-wide registry.
///
/// Intended for program startup only.
pub fn register(action: ActionRef) -> Result<(), RegistryError> {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(action)
}

/// Snapshot of the process-wide registry.
pub fn global() -> Registry {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
