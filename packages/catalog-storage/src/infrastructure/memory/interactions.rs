//! In-memory interaction log and order history

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::models::{Interaction, InteractionKind, Order, ProductId, UserId};
use crate::domain::ports::{InteractionLogStore, OrderHistoryStore};
use crate::error::Result;

/// Append-only log, kept in insertion order
#[derive(Clone, Default)]
pub struct InMemoryInteractionLog {
    entries: Arc<RwLock<Vec<Interaction>>>,
}

impl InMemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, pred: impl Fn(&Interaction) -> bool) -> Vec<Interaction> {
        self.entries
            .read()
            .iter()
            .filter(|i| pred(i))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InteractionLogStore for InMemoryInteractionLog {
    async fn append(&self, interaction: Interaction) -> Result<()> {
        self.entries.write().push(interaction);
        Ok(())
    }

    async fn query_by_product(
        &self,
        product_id: ProductId,
        kind: Option<InteractionKind>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Interaction>> {
        Ok(self.select(|i| {
            i.product_id == product_id
                && kind.map_or(true, |k| i.kind == k)
                && i.timestamp >= since
        }))
    }

    async fn query_by_user(
        &self,
        user_id: UserId,
        kind: Option<InteractionKind>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Interaction>> {
        Ok(self.select(|i| {
            i.user_id == Some(user_id)
                && kind.map_or(true, |k| i.kind == k)
                && i.timestamp >= since
        }))
    }

    async fn query_window(&self, since: DateTime<Utc>) -> Result<Vec<Interaction>> {
        Ok(self.select(|i| i.timestamp >= since))
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|i| i.timestamp >= cutoff);
        Ok(before - entries.len())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryOrderHistory {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: Arc::new(RwLock::new(orders.into_iter().collect())),
        }
    }

    pub fn push(&self, order: Order) {
        self.orders.write().push(order);
    }
}

#[async_trait]
impl OrderHistoryStore for InMemoryOrderHistory {
    async fn orders_containing(&self, product_id: ProductId) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .iter()
            .filter(|o| o.contains(product_id))
            .cloned()
            .collect())
    }

    async fn list_orders(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .iter()
            .filter(|o| since.map_or(true, |s| o.created_at >= s))
            .cloned()
            .collect())
    }
}
