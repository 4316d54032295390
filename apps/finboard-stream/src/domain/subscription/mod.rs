//! Subscription Registry
//!
//! Tracks which listeners want trade events for which symbols.
//!
//! # Design
//!
//! The registry maps each symbol to the listeners registered for it, keyed by
//! a monotonically increasing [`ListenerId`] so iteration follows registration
//! order. A symbol is present if and only if it has at least one listener:
//! removing the last listener removes the entry and reports
//! [`RegistryChange::SymbolDeactivated`] so the caller can drop the upstream
//! subscription. Many listeners share one upstream subscription.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::domain::streaming::{Symbol, TradeEvent};

// =============================================================================
// Types
// =============================================================================

/// Identifier handed out for every registration. Never reused by a registry.
pub type ListenerId = u64;

/// Handler of trade events for one symbol.
///
/// Returning an error (or panicking) only affects this listener: the
/// dispatcher logs the failure and moves on to the next one.
pub trait Listener: Send + Sync + 'static {
    /// Handle one trade event.
    ///
    /// # Errors
    ///
    /// Any error is logged by the dispatcher and otherwise ignored.
    fn on_trade(&self, trade: &TradeEvent) -> anyhow::Result<()>;
}

impl<F> Listener for F
where
    F: Fn(&TradeEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_trade(&self, trade: &TradeEvent) -> anyhow::Result<()> {
        self(trade)
    }
}

/// Shared, type-erased listener.
pub type SharedListener = Arc<dyn Listener>;

/// Effect of a registry mutation on the set of active symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// Active symbol set unchanged.
    Unchanged,
    /// The symbol gained its first listener; upstream must subscribe.
    SymbolActivated,
    /// The symbol lost its last listener; upstream must unsubscribe.
    SymbolDeactivated,
}

/// Result of registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Identifier to pass back when unsubscribing.
    pub id: ListenerId,
    /// Whether the symbol just became active.
    pub change: RegistryChange,
}

// =============================================================================
// Registry
// =============================================================================

/// Mapping from symbol to its listeners.
///
/// Not synchronized; owners wrap it in a lock.
#[derive(Default)]
pub struct SubscriptionRegistry {
    listeners: HashMap<Symbol, BTreeMap<ListenerId, SharedListener>>,
    next_id: ListenerId,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("symbols", &self.listeners.len())
            .field("listeners", &self.listener_count())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `symbol`.
    pub fn register(&mut self, symbol: Symbol, listener: SharedListener) -> Registration {
        let id = self.next_id;
        self.next_id += 1;

        let entry = self.listeners.entry(symbol).or_default();
        let change = if entry.is_empty() {
            RegistryChange::SymbolActivated
        } else {
            RegistryChange::Unchanged
        };
        entry.insert(id, listener);

        Registration { id, change }
    }

    /// Remove listener `id` from `symbol`.
    ///
    /// Unknown symbols or ids are a no-op, so removing twice is harmless.
    pub fn remove(&mut self, symbol: &str, id: ListenerId) -> RegistryChange {
        let Some(entry) = self.listeners.get_mut(symbol) else {
            return RegistryChange::Unchanged;
        };

        if entry.remove(&id).is_none() {
            return RegistryChange::Unchanged;
        }

        if entry.is_empty() {
            self.listeners.remove(symbol);
            RegistryChange::SymbolDeactivated
        } else {
            RegistryChange::Unchanged
        }
    }

    /// Copy of the listeners for `symbol`, in registration order.
    ///
    /// Dispatch iterates the copy so listeners may subscribe or unsubscribe
    /// while being invoked.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<SharedListener> {
        self.listeners
            .get(symbol)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `symbol` has at least one listener.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.listeners.contains_key(symbol)
    }

    /// Whether `id` is still registered under `symbol`.
    #[must_use]
    pub fn is_registered(&self, symbol: &str, id: ListenerId) -> bool {
        self.listeners
            .get(symbol)
            .is_some_and(|entry| entry.contains_key(&id))
    }

    /// All active symbols, sorted.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self.listeners.keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Number of listeners registered for `symbol`.
    #[must_use]
    pub fn listeners_for(&self, symbol: &str) -> usize {
        self.listeners.get(symbol).map_or(0, BTreeMap::len)
    }

    /// Total number of listeners across all symbols.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(BTreeMap::len).sum()
    }

    /// Whether no symbol has listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drop every registration. Returns the symbols that were active.
    pub fn clear(&mut self) -> Vec<Symbol> {
        let symbols = self.active_symbols();
        self.listeners.clear();
        symbols
    }

    /// Current counts.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            symbol_count: self.listeners.len(),
            listener_count: self.listener_count(),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Registry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of symbols with at least one listener.
    pub symbol_count: usize,
    /// Number of listeners across all symbols.
    pub listener_count: usize,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use proptest::prelude::*;

    use super::*;

    fn listener(
        f: impl Fn(&TradeEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> SharedListener {
        Arc::new(f)
    }

    fn noop() -> SharedListener {
        listener(|_| Ok(()))
    }

    #[test]
    fn first_listener_activates_symbol() {
        let mut registry = SubscriptionRegistry::new();

        let first = registry.register("AAPL".to_string(), noop());
        let second = registry.register("AAPL".to_string(), noop());

        assert_eq!(first.change, RegistryChange::SymbolActivated);
        assert_eq!(second.change, RegistryChange::Unchanged);
        assert_ne!(first.id, second.id);
        assert_eq!(registry.listeners_for("AAPL"), 2);
    }

    #[test]
    fn last_listener_deactivates_symbol() {
        let mut registry = SubscriptionRegistry::new();
        let first = registry.register("AAPL".to_string(), noop());
        let second = registry.register("AAPL".to_string(), noop());

        assert_eq!(registry.remove("AAPL", first.id), RegistryChange::Unchanged);
        assert!(registry.contains("AAPL"));

        assert_eq!(
            registry.remove("AAPL", second.id),
            RegistryChange::SymbolDeactivated
        );
        assert!(!registry.contains("AAPL"));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_twice_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        let reg = registry.register("MSFT".to_string(), noop());

        assert_eq!(
            registry.remove("MSFT", reg.id),
            RegistryChange::SymbolDeactivated
        );
        assert_eq!(registry.remove("MSFT", reg.id), RegistryChange::Unchanged);
        assert_eq!(registry.remove("NOPE", 42), RegistryChange::Unchanged);
    }

    #[test]
    fn remove_under_wrong_symbol_keeps_listener() {
        let mut registry = SubscriptionRegistry::new();
        let reg = registry.register("AAPL".to_string(), noop());
        registry.register("MSFT".to_string(), noop());

        assert_eq!(registry.remove("MSFT", reg.id), RegistryChange::Unchanged);
        assert!(registry.is_registered("AAPL", reg.id));
    }

    #[test]
    fn symbols_are_case_sensitive() {
        let mut registry = SubscriptionRegistry::new();
        registry.register("AAPL".to_string(), noop());

        assert!(registry.contains("AAPL"));
        assert!(!registry.contains("aapl"));
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();

        for tag in 0..4 {
            let calls = Arc::clone(&calls);
            registry.register(
                "TSLA".to_string(),
                listener(move |_| {
                    calls.lock().unwrap().push(tag);
                    Ok(())
                }),
            );
        }

        let trade = TradeEvent::new(
            "TSLA",
            rust_decimal::Decimal::ONE,
            rust_decimal::Decimal::ONE,
            chrono::Utc::now(),
        );
        for listener in registry.snapshot("TSLA") {
            listener.on_trade(&trade).unwrap();
        }

        assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn snapshot_of_unknown_symbol_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.snapshot("NVDA").is_empty());
    }

    #[test]
    fn clear_returns_active_symbols() {
        let mut registry = SubscriptionRegistry::new();
        registry.register("MSFT".to_string(), noop());
        registry.register("AAPL".to_string(), noop());
        registry.register("AAPL".to_string(), noop());

        assert_eq!(registry.stats().listener_count, 3);
        assert_eq!(registry.clear(), vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Subscribe(usize),
        Unsubscribe(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize).prop_map(Op::Subscribe),
            (0..32usize).prop_map(Op::Unsubscribe),
        ]
    }

    proptest! {
        #[test]
        fn symbol_present_iff_it_has_listeners(ops in prop::collection::vec(op_strategy(), 0..64)) {
            const SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "TSLA", "NVDA"];

            let mut registry = SubscriptionRegistry::new();
            let mut live: Vec<(Symbol, ListenerId)> = Vec::new();
            let mut issued: Vec<(Symbol, ListenerId)> = Vec::new();

            for op in ops {
                match op {
                    Op::Subscribe(idx) => {
                        let symbol = SYMBOLS[idx].to_string();
                        let had = live.iter().any(|(s, _)| *s == symbol);
                        let reg = registry.register(symbol.clone(), noop());
                        prop_assert_eq!(
                            reg.change == RegistryChange::SymbolActivated,
                            !had
                        );
                        live.push((symbol.clone(), reg.id));
                        issued.push((symbol, reg.id));
                    }
                    Op::Unsubscribe(idx) => {
                        if issued.is_empty() {
                            continue;
                        }
                        let (symbol, id) = issued[idx % issued.len()].clone();
                        let was_live = live.iter().any(|(s, i)| *s == symbol && *i == id);
                        live.retain(|(s, i)| !(*s == symbol && *i == id));
                        let still_has = live.iter().any(|(s, _)| *s == symbol);

                        let change = registry.remove(&symbol, id);
                        prop_assert_eq!(
                            change == RegistryChange::SymbolDeactivated,
                            was_live && !still_has
                        );
                    }
                }

                for symbol in SYMBOLS {
                    let expected = live.iter().filter(|(s, _)| s == symbol).count();
                    prop_assert_eq!(registry.contains(symbol), expected > 0);
                    prop_assert_eq!(registry.listeners_for(symbol), expected);
                }
                prop_assert_eq!(registry.listener_count(), live.len());
            }
        }
    }
}
