//! Scripted in-memory repository for processor tests.

use async_trait::async_trait;
use itemflow_core::{Item, ItemId, ItemRepository, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockRepository {
    ids: Vec<ItemId>,
    items: Mutex<HashMap<ItemId, Item>>,
    fetch_delays: HashMap<ItemId, Duration>,
    save_delays: HashMap<ItemId, Duration>,
    failing_fetch: HashSet<ItemId>,
    failing_save: HashSet<ItemId>,
    hanging_fetch: HashSet<ItemId>,
    panicking_fetch: HashSet<ItemId>,
    failing_list: bool,
    normalize_on_save: bool,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completion_order: Mutex<Vec<u64>>,
}

impl MockRepository {
    /// Unprocessed items for every id, listed in the given order.
    pub fn with_items(ids: impl IntoIterator<Item = u64>) -> Self {
        let ids: Vec<ItemId> = ids.into_iter().map(ItemId).collect();
        let items = ids
            .iter()
            .map(|&id| {
                let item = Item::new(
                    id,
                    format!("Item {id}"),
                    format!("Description {id}"),
                    format!("test{id}@example.com"),
                );
                (id, item)
            })
            .collect();

        Self {
            ids,
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Keep the id in the listing but drop the record.
    pub fn without_item(self, id: u64) -> Self {
        self.items.lock().unwrap().remove(&ItemId(id));
        self
    }

    pub fn fetch_delay(mut self, id: u64, delay: Duration) -> Self {
        self.fetch_delays.insert(ItemId(id), delay);
        self
    }

    pub fn save_delay(mut self, id: u64, delay: Duration) -> Self {
        self.save_delays.insert(ItemId(id), delay);
        self
    }

    pub fn failing_fetch(mut self, id: u64) -> Self {
        self.failing_fetch.insert(ItemId(id));
        self
    }

    pub fn failing_save(mut self, id: u64) -> Self {
        self.failing_save.insert(ItemId(id));
        self
    }

    pub fn hanging_fetch(mut self, id: u64) -> Self {
        self.hanging_fetch.insert(ItemId(id));
        self
    }

    pub fn panicking_fetch(mut self, id: u64) -> Self {
        self.panicking_fetch.insert(ItemId(id));
        self
    }

    pub const fn failing_list(mut self) -> Self {
        self.failing_list = true;
        self
    }

    /// Upper-case names on save, to show the stored copy is returned.
    pub const fn normalize_on_save(mut self) -> Self {
        self.normalize_on_save = true;
        self
    }

    pub fn stored(&self, id: u64) -> Option<Item> {
        self.items.lock().unwrap().get(&ItemId(id)).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Most units seen between the start of a fetch and the end of the
    /// matching save at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Ids in the order their saves finished.
    pub fn completion_order(&self) -> Vec<u64> {
        self.completion_order.lock().unwrap().clone()
    }
}

impl MockRepository {
    fn enter_unit(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave_unit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn fetch(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        if let Some(delay) = self.fetch_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.hanging_fetch.contains(&id) {
            std::future::pending::<()>().await;
        }
        assert!(!self.panicking_fetch.contains(&id), "fetch of {id} blew up");
        if self.failing_fetch.contains(&id) {
            return Err(format!("fetch of {id} was interrupted").into());
        }

        Ok(self.items.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl ItemRepository for MockRepository {
    async fn list_ids(&self) -> Result<Vec<ItemId>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_list {
            return Err("listing unavailable".into());
        }
        Ok(self.ids.clone())
    }

    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.enter_unit();

        let found = self.fetch(id).await;
        // The unit ends here unless a save follows.
        if !matches!(found, Ok(Some(_))) {
            self.leave_unit();
        }
        found
    }

    async fn save(&self, mut item: Item) -> Result<Item, StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let id = item.id;

        if let Some(delay) = self.save_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_save.contains(&id) {
            self.leave_unit();
            return Err(format!("disk full while saving {id}").into());
        }
        if self.normalize_on_save {
            item.name = item.name.to_uppercase();
        }

        self.items.lock().unwrap().insert(id, item.clone());
        self.completion_order.lock().unwrap().push(id.0);
        self.leave_unit();
        Ok(item)
    }
}
