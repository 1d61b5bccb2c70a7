// Data models for the OV-chipkaart API

pub mod envelope;
pub mod cards;
pub mod transactions;

pub use cards::{Card, CardDetails};
pub use envelope::{Envelope, SUCCESS_CODE};
pub use transactions::{
    truncate_to_seconds, RequestContext, TransactionPage, TransactionRecord, YearTransactions,
    PAGE_SIZE,
};
