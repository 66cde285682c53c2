pub mod category;
pub mod money;
pub mod period;
pub mod transaction;

pub use category::{Category, UnknownCategory};
pub use money::{Money, MoneyOverflow, MoneyParseError};
pub use period::{DateRange, PeriodError};
pub use transaction::{Transaction, TransactionBatch, TransactionId};
