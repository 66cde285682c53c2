pub mod batch;
pub mod db;

pub use batch::{batch_file_name, load_batch, save_batch, BatchError};
pub use db::{
    category_totals, create_db, create_memory_db, get_transactions, record_batch,
    update_categories, DbPool, LedgerError,
};
