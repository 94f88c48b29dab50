//! Test helpers: the configuration override stack and environment mocking.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    marker::PhantomData,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{key::normalize_key, source::Source};

/// Stack of override layers consulted before all other sources.
///
/// A manager built with the default builder settings owns one (see
/// [`ConfigManager::overrides`](crate::ConfigManager::overrides)). Tests push
/// layers of `(key, value)` pairs; the last pushed layer shadows earlier ones
/// and all regular sources. Handles are cheap clones sharing the same stack.
#[derive(Debug, Clone, Default)]
pub struct OverrideStack {
    layers: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
}

impl OverrideStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<BTreeMap<String, String>>> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a layer of overrides. Keys are canonicalized, so any case works.
    pub fn push<K, V>(&self, vars: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let layer: BTreeMap<_, _> = vars
            .into_iter()
            .map(|(key, value)| (key.into().to_ascii_uppercase(), value.into()))
            .collect();
        self.lock().push(layer);
    }

    /// Pops the most recently pushed layer.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty; unbalanced pops are a bug in the calling
    /// test.
    pub fn pop(&self) {
        let popped = self.lock().pop();
        assert!(popped.is_some(), "popped an empty override stack");
    }

    /// Pushes a layer and returns a guard popping it on drop.
    pub fn push_guard<K, V>(&self, vars: impl IntoIterator<Item = (K, V)>) -> OverrideGuard
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(vars);
        OverrideGuard {
            stack: self.clone(),
        }
    }

    /// Runs `action` with a layer of overrides in place.
    pub fn with_overrides<K, V, R>(
        &self,
        vars: impl IntoIterator<Item = (K, V)>,
        action: impl FnOnce() -> R,
    ) -> R
    where
        K: Into<String>,
        V: Into<String>,
    {
        let _guard = self.push_guard(vars);
        action()
    }

    /// Whether no layers are currently pushed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Source for OverrideStack {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let layers = self.lock();
        if layers.is_empty() {
            return None;
        }
        let full_key = normalize_key(key, namespace);
        layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(&full_key).cloned())
    }
}

/// Guard popping an override layer when dropped. Returned by
/// [`OverrideStack::push_guard`].
#[derive(Debug)]
#[must_use = "dropping the guard immediately removes the overrides"]
pub struct OverrideGuard {
    stack: OverrideStack,
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

thread_local! {
    static MOCK_ENV_VARS: RefCell<Option<HashMap<String, String>>> = const { RefCell::new(None) };
}

/// Mocked value for the variable, or `None` if no guard is active on this
/// thread. While a guard is active the real environment must not be consulted.
pub(crate) fn mock_env_vars(name: &str) -> Option<Option<String>> {
    MOCK_ENV_VARS.with(|cell| {
        let vars = cell.borrow();
        Some(vars.as_ref()?.get(name).cloned())
    })
}

/// Guard mocking environment variables for [`OsEnv`](crate::OsEnv) lookups on
/// the current thread.
///
/// Mocks are thread-local and do not touch the process environment, so tests
/// using them can run in parallel. Guards cannot be nested on one thread and
/// are not sendable across threads.
#[derive(Debug)]
#[must_use = "dropping the guard immediately removes mocked env variables"]
pub struct MockEnvGuard {
    _not_send: PhantomData<*mut ()>,
}

impl MockEnvGuard {
    /// Mocks the specified variables until the guard is dropped.
    ///
    /// # Panics
    ///
    /// Panics if another guard is active on this thread.
    pub fn new<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        MOCK_ENV_VARS.with(|cell| {
            let mut cell = cell.borrow_mut();
            assert!(cell.is_none(), "mock env vars are already set on this thread");
            *cell = Some(
                vars.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            );
        });
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for MockEnvGuard {
    fn drop(&mut self) {
        MOCK_ENV_VARS.with(|cell| cell.borrow_mut().take());
    }
}
