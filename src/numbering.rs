//! Receipt numbers: `TR` + `yymm` + 4 digit sequence, e.g. `TR25020007`.
//!
//! Each period owns a row in `receipt_counters`. Allocation increments that row
//! inside the caller's transaction, so concurrent issuances in the same month
//! serialize on the counter instead of racing on "max + 1".

use crate::{Error, Result, Service};
use chrono::{DateTime, Utc};
use entity::{receipt, receipt_counter};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

pub const PREFIX: &str = "TR";
pub const MAX_SEQUENCE: i32 = 9999;

/// `yymm` bucket of the time.
pub fn period(at: DateTime<Utc>) -> String {
    at.format("%y%m").to_string()
}

pub fn format_number(period: &str, seq: i32) -> String {
    format!("{}{}{:04}", PREFIX, period, seq)
}

/// Sequence of a receipt number issued in `period`.
pub fn parse_sequence(number: &str, period: &str) -> Option<i32> {
    let seq = number.strip_prefix(PREFIX)?.strip_prefix(period)?;
    if seq.len() != 4 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

async fn increment<C: ConnectionTrait>(conn: &C, period: &str) -> Result<bool> {
    let res = receipt_counter::Entity::update_many()
        .col_expr(
            receipt_counter::Column::LastSeq,
            Expr::col(receipt_counter::Column::LastSeq).add(1),
        )
        .filter(receipt_counter::Column::Period.eq(period))
        .filter(receipt_counter::Column::LastSeq.lt(MAX_SEQUENCE))
        .exec(conn)
        .await?;
    Ok(res.rows_affected == 1)
}

/// Highest sequence already issued in the period, 0 if none.
async fn max_issued<C: ConnectionTrait>(conn: &C, period: &str) -> Result<i32> {
    let numbers: Vec<String> = receipt::Entity::find()
        .select_only()
        .column(receipt::Column::ReceiptNumber)
        .filter(receipt::Column::ReceiptNumber.starts_with(format!("{}{}", PREFIX, period)))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(numbers
        .iter()
        .filter_map(|n| parse_sequence(n, period))
        .max()
        .unwrap_or(0))
}

/// Allocate the next receipt number of `period`.
///
/// Must run inside a transaction that also persists the receipt, the counter
/// update is the first statement so the write lock is held until commit.
pub async fn allocate<C: ConnectionTrait>(conn: &C, period: &str) -> Result<String> {
    if !increment(conn, period).await? {
        let exists = receipt_counter::Entity::find_by_id(period.to_owned())
            .one(conn)
            .await?
            .is_some();
        if exists {
            return Err(Error::SequenceExhausted(period.to_owned()));
        }

        // first receipt of the period, seed from receipts issued before the counter existed
        let seed = max_issued(conn, period).await?;
        receipt_counter::Entity::insert(receipt_counter::ActiveModel {
            period: Set(period.to_owned()),
            last_seq: Set(seed),
        })
        .on_conflict(
            OnConflict::column(receipt_counter::Column::Period)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
        debug!(period, seed, "receipt counter seeded");

        if !increment(conn, period).await? {
            return Err(Error::SequenceExhausted(period.to_owned()));
        }
    }

    let counter = receipt_counter::Entity::find_by_id(period.to_owned())
        .one(conn)
        .await?
        .ok_or(Error::Str("receipt counter disappeared"))?;
    Ok(format_number(period, counter.last_seq))
}

impl Service {
    /// Allocate a receipt number outside of issuance.
    pub async fn next_receipt_number(&self, at: DateTime<Utc>) -> Result<String> {
        let txn = self.db().begin().await?;
        match allocate(&txn, &period(at)).await {
            Ok(number) => {
                txn.commit().await?;
                Ok(number)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err)
            }
        }
    }
}
