//! Memos
//!
//! The memo collection as seen by one page or connection.
//!
//! - **MemoList**: newest-first list with an id-based duplicate guard
//! - **MemoStore**: typed calls against the `memos` table
//! - **MemoBoard**: page state, live feed mounting and teardown

mod board;
mod list;
mod store;

pub use board::{LiveFeed, MemoBoard};
pub use list::{Memo, MemoList};
pub use store::{MemoChange, MemoStore, MEMOS_TABLE};
