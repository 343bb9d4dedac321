//! Strategy state.

use parking_lot::RwLock;
use robot_core::{Strategy, StrategyStatus, StrategyUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct StrategyState {
    strategies: HashMap<String, Strategy>,
    selected: Option<String>,
    loading: bool,
}

/// Strategies by id, the selected strategy and a loading flag.
#[derive(Debug, Clone, Default)]
pub struct StrategyStore {
    state: Arc<RwLock<StrategyState>>,
}

impl StrategyStore {
    /// Replace the whole list (after a fetch). Clears a selection that no
    /// longer exists.
    pub fn set_strategies(&self, strategies: Vec<Strategy>) {
        let mut state = self.state.write();
        state.strategies = strategies
            .into_iter()
            .map(|strategy| (strategy.id.clone(), strategy))
            .collect();
        if let Some(selected) = &state.selected {
            if !state.strategies.contains_key(selected) {
                state.selected = None;
            }
        }
        state.loading = false;
    }

    pub fn upsert(&self, strategy: Strategy) {
        self.state
            .write()
            .strategies
            .insert(strategy.id.clone(), strategy);
    }

    pub fn remove(&self, id: &str) -> Option<Strategy> {
        let mut state = self.state.write();
        if state.selected.as_deref() == Some(id) {
            state.selected = None;
        }
        state.strategies.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Strategy> {
        self.state.read().strategies.get(id).cloned()
    }

    /// All strategies ordered by name, then id.
    pub fn strategies(&self) -> Vec<Strategy> {
        let mut strategies: Vec<Strategy> =
            self.state.read().strategies.values().cloned().collect();
        strategies.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        strategies
    }

    pub fn running_count(&self) -> usize {
        self.state
            .read()
            .strategies
            .values()
            .filter(|s| s.status == StrategyStatus::Running)
            .count()
    }

    /// Select a known strategy. Returns `false` for an unknown id.
    pub fn select(&self, id: &str) -> bool {
        let mut state = self.state.write();
        if state.strategies.contains_key(id) {
            state.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&self) {
        self.state.write().selected = None;
    }

    pub fn selected(&self) -> Option<Strategy> {
        let state = self.state.read();
        state
            .selected
            .as_ref()
            .and_then(|id| state.strategies.get(id))
            .cloned()
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Apply a realtime update. Returns `false` when the strategy is unknown.
    pub fn apply_update(&self, update: &StrategyUpdate) -> bool {
        let mut state = self.state.write();
        match state.strategies.get_mut(&update.id) {
            Some(strategy) => {
                update.apply_to(strategy);
                true
            }
            None => {
                debug!(strategy_id = %update.id, "Update for unknown strategy ignored");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strategy(id: &str, name: &str) -> Strategy {
        serde_json::from_value(json!({"id": id, "name": name, "type": "grid_trading"})).unwrap()
    }

    #[test]
    fn test_set_and_order() {
        let store = StrategyStore::default();
        store.set_loading(true);
        store.set_strategies(vec![strategy("2", "ETH grid"), strategy("1", "BTC dca")]);

        let names: Vec<String> = store.strategies().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["BTC dca", "ETH grid"]);
        assert!(!store.is_loading());
    }

    #[test]
    fn test_selection_follows_list() {
        let store = StrategyStore::default();
        store.set_strategies(vec![strategy("1", "a"), strategy("2", "b")]);
        assert!(store.select("2"));
        assert!(!store.select("9"));
        assert_eq!(store.selected().map(|s| s.id), Some("2".to_string()));

        store.set_strategies(vec![strategy("1", "a")]);
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_apply_update() {
        let store = StrategyStore::default();
        store.set_strategies(vec![strategy("1", "a")]);

        let update: StrategyUpdate =
            serde_json::from_value(json!({"strategy_id": "1", "status": "running", "total_trades": 3}))
                .unwrap();
        assert!(store.apply_update(&update));
        let updated = store.get("1").unwrap();
        assert_eq!(updated.status, StrategyStatus::Running);
        assert_eq!(updated.total_trades, 3);
        assert_eq!(store.running_count(), 1);

        let unknown: StrategyUpdate = serde_json::from_value(json!({"id": "7"})).unwrap();
        assert!(!store.apply_update(&unknown));
    }

    #[test]
    fn test_remove_clears_selection() {
        let store = StrategyStore::default();
        store.upsert(strategy("1", "a"));
        store.select("1");
        assert!(store.remove("1").is_some());
        assert!(store.selected().is_none());
        assert!(store.is_empty());
    }
}
