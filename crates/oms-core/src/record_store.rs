//! In-memory order record store (the persistence tier).
//!
//! One [`OrderRecord`] per ClOrdID:
//! - created by the first new-order for that identifier,
//! - overwritten in place by every status-changing execution report,
//! - never deleted (audit trail).
//!
//! Only a point-in-time snapshot is kept: status, exec type and the
//! creation / last-update timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::messages::{ExecutionReport, NewOrder};
use crate::order_status::OrdStatus;

/// Stored state of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub cl_ord_id: String,

    /// Current OrdStatus (39).
    pub status: OrdStatus,

    /// ExecType (150) of the last report that carried one.
    pub exec_type: OrdStatus,

    pub side: String,
    pub currency: String,
    pub quantity: String,
    pub price: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ClOrdID -> OrderRecord behind a single readers-writer lock.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<HashMap<String, OrderRecord>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        RecordStore::default()
    }

    /// Create a record for a new order, stamped with the current time.
    pub fn create(&self, order: &NewOrder) -> Result<(), StoreError> {
        self.create_at(order, Utc::now())
    }

    /// Create a record for a new order with an explicit timestamp.
    ///
    /// Duplicate identifiers are rejected and the existing record keeps
    /// its values.
    pub fn create_at(&self, order: &NewOrder, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&order.cl_ord_id) {
            return Err(StoreError::DuplicateRecord(order.cl_ord_id.clone()));
        }

        records.insert(
            order.cl_ord_id.clone(),
            OrderRecord {
                cl_ord_id: order.cl_ord_id.clone(),
                status: OrdStatus::New,
                exec_type: OrdStatus::New,
                side: order.side.clone(),
                currency: order.currency.clone(),
                quantity: order.quantity.clone(),
                price: order.price.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Apply an execution report, stamped with the current time.
    ///
    /// Returns the status the record had before the update.
    pub fn update(&self, report: &ExecutionReport) -> Result<OrdStatus, StoreError> {
        self.update_at(report, Utc::now())
    }

    /// Apply an execution report with an explicit timestamp.
    ///
    /// An unknown identifier is rejected; it never creates a record.
    pub fn update_at(
        &self,
        report: &ExecutionReport,
        now: DateTime<Utc>,
    ) -> Result<OrdStatus, StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&report.cl_ord_id)
            .ok_or_else(|| StoreError::UnknownRecord(report.cl_ord_id.clone()))?;

        let previous = record.status;
        record.status = report.status;
        if let Some(exec_type) = report.exec_type {
            record.exec_type = exec_type;
        }
        record.updated_at = now;

        Ok(previous)
    }

    /// Snapshot of a record.
    pub fn get(&self, cl_ord_id: &str) -> Option<OrderRecord> {
        self.records.read().get(cl_ord_id).cloned()
    }

    /// Current status of a record.
    pub fn status(&self, cl_ord_id: &str) -> Option<OrdStatus> {
        self.records.read().get(cl_ord_id).map(|record| record.status)
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
