//! In-process image store with fault injection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use super::{Filter, ImageStore, Record, RecordFields, Select};
use crate::error::StoreError;
use crate::model::RecordId;

/// Store operation, used to target injected faults and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `query`
    Query,
    /// `create_record`
    Create,
    /// `retrieve_record`
    Retrieve,
    /// `update_record`
    Update,
    /// `delete_record`
    Delete,
}

/// A planned failure for one operation.
#[derive(Debug, Clone, Copy)]
struct Fault {
    /// Calls that still succeed before the fault fires
    skip: usize,
    /// Keep failing after the first hit
    persistent: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Record>,
    next_id: u64,
    faults: HashMap<Operation, Fault>,
    calls: HashMap<Operation, usize>,
}

/// Image store held entirely in memory.
///
/// Clones share the same records, so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing fault injection and call counts.
    pub fn seed(&self, fields: RecordFields) -> RecordId {
        let mut inner = self.inner.borrow_mut();
        let id = Self::issue_id(&mut inner);
        inner.records.push(Record::from_fields(id.clone(), fields));
        id
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<Record> {
        self.inner.borrow().records.clone()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.inner.borrow().records.iter().any(|r| &r.id == id)
    }

    /// Make the `nth` upcoming call (1-based) of `op` fail once.
    pub fn fail_nth(&self, op: Operation, nth: usize) {
        let skip = nth.saturating_sub(1);
        self.inner.borrow_mut().faults.insert(
            op,
            Fault {
                skip,
                persistent: false,
            },
        );
    }

    /// Make every upcoming call of `op` fail.
    pub fn fail_always(&self, op: Operation) {
        self.inner.borrow_mut().faults.insert(
            op,
            Fault {
                skip: 0,
                persistent: true,
            },
        );
    }

    /// Remove all planned faults.
    pub fn heal(&self) {
        self.inner.borrow_mut().faults.clear();
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.inner.borrow().calls.get(&op).copied().unwrap_or(0)
    }

    fn issue_id(inner: &mut Inner) -> RecordId {
        inner.next_id += 1;
        RecordId::new(format!("rec-{:04}", inner.next_id))
    }

    /// Count the call and fire a planned fault if one is due.
    fn enter(&self, op: Operation) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        *inner.calls.entry(op).or_insert(0) += 1;

        let Some(fault) = inner.faults.get_mut(&op) else {
            return Ok(());
        };
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        if !fault.persistent {
            inner.faults.remove(&op);
        }
        Err(StoreError::Unavailable(format!("injected {:?} failure", op)))
    }
}

#[async_trait(?Send)]
impl ImageStore for MemoryStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        self.enter(Operation::Query)?;
        let inner = self.inner.borrow();
        Ok(inner
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create_record(&self, fields: RecordFields) -> Result<RecordId, StoreError> {
        self.enter(Operation::Create)?;
        let mut inner = self.inner.borrow_mut();
        let id = Self::issue_id(&mut inner);
        inner.records.push(Record::from_fields(id.clone(), fields));
        Ok(id)
    }

    async fn retrieve_record(&self, id: &RecordId, select: Select) -> Result<Record, StoreError> {
        self.enter(Operation::Retrieve)?;
        let inner = self.inner.borrow();
        inner
            .records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| select.project(r))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_record(&self, id: &RecordId, fields: RecordFields) -> Result<(), StoreError> {
        self.enter(Operation::Update)?;
        let mut inner = self.inner.borrow_mut();
        let record = inner
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply(fields);
        Ok(())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError> {
        self.enter(Operation::Delete)?;
        let mut inner = self.inner.borrow_mut();
        let before = inner.records.len();
        inner.records.retain(|r| &r.id != id);
        if inner.records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
