use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// Operations the replay CLI understands. One CSV row per operation, columns
/// `op, actor, target, amount, arg`; `target` is a caller-chosen handle the
/// driver maps to allocated ids.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Account,
    Credit,
    Order,
    Price,
    Approve,
    Pay,
    Complete,
    Cancel,
    Package,
    CustomsFee,
    PayCustoms,
    Advance,
    Wallet,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OpKind,
    pub actor: u64,
    pub target: Option<u64>,
    pub amount: Option<Decimal>,
    pub arg: Option<String>,
}

/// Streams operation records from a CSV source: whitespace-trimmed, flexible
/// row lengths, lazy deserialization.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CoreError::from))
    }
}
