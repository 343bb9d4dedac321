//! Orders, positions and balances.

use parking_lot::RwLock;
use robot_core::{AccountBalance, Order, Position};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Orders kept before the least recently touched terminal ones are evicted.
/// Open orders are never evicted.
pub const ORDER_HISTORY_CAP: usize = 500;

/// Outcome of [`TradingStore::apply_order_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    /// First time this order was seen.
    Created,
    /// A known order moved to a new state.
    Updated,
}

#[derive(Debug)]
struct TrackedOrder {
    /// Write sequence; higher is more recently touched.
    seq: u64,
    order: Order,
}

#[derive(Debug, Default)]
struct TradingState {
    orders: HashMap<String, TrackedOrder>,
    next_seq: u64,
    positions: HashMap<String, Position>,
    balances: HashMap<String, AccountBalance>,
}

impl TradingState {
    /// Store `order` as the most recently touched; true when it replaced one.
    fn track(&mut self, order: Order) -> bool {
        self.next_seq += 1;
        let tracked = TrackedOrder {
            seq: self.next_seq,
            order,
        };
        self.orders
            .insert(tracked.order.id.clone(), tracked)
            .is_some()
    }

    fn evict_terminal_orders(&mut self) {
        while self.orders.len() > ORDER_HISTORY_CAP {
            let oldest = self
                .orders
                .iter()
                .filter(|(_, t)| t.order.status.is_terminal())
                .min_by_key(|(_, t)| t.seq)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    self.orders.remove(&id);
                }
                None => break,
            }
        }
    }
}

/// Orders by id, positions by symbol, balances by currency.
#[derive(Debug, Clone, Default)]
pub struct TradingStore {
    state: Arc<RwLock<TradingState>>,
}

impl TradingStore {
    pub fn set_orders(&self, mut orders: Vec<Order>) {
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut state = self.state.write();
        state.orders.clear();
        for order in orders {
            state.track(order);
        }
        state.evict_terminal_orders();
    }

    /// Insert or replace an order from a realtime update.
    pub fn apply_order_update(&self, order: Order) -> OrderChange {
        let mut state = self.state.write();
        let change = if state.track(order) {
            OrderChange::Updated
        } else {
            OrderChange::Created
        };
        state.evict_terminal_orders();
        change
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.state.read().orders.get(id).map(|t| t.order.clone())
    }

    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }

    /// All orders, newest first.
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .state
            .read()
            .orders
            .values()
            .map(|t| t.order.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    /// Orders not yet in a terminal state, newest first.
    pub fn open_orders(&self) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|order| !order.status.is_terminal())
            .collect()
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        self.state.write().positions = positions
            .into_iter()
            .filter(|p| !p.size.is_zero())
            .map(|p| (p.symbol.clone(), p))
            .collect();
    }

    /// Insert or replace; a zero-size position is removed.
    pub fn upsert_position(&self, position: Position) {
        let mut state = self.state.write();
        if position.size.is_zero() {
            state.positions.remove(&position.symbol);
        } else {
            state.positions.insert(position.symbol.clone(), position);
        }
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.state.read().positions.get(symbol).cloned()
    }

    /// Open positions ordered by symbol.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> =
            self.state.read().positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.state
            .read()
            .positions
            .values()
            .map(|p| p.unrealized_pnl)
            .sum()
    }

    pub fn set_balances(&self, balances: Vec<AccountBalance>) {
        self.state.write().balances = balances
            .into_iter()
            .map(|b| (b.currency.clone(), b))
            .collect();
    }

    pub fn balance(&self, currency: &str) -> Option<AccountBalance> {
        self.state.read().balances.get(currency).cloned()
    }
}
