#![allow(async_fn_in_trait)]
pub mod collection;
pub mod config;
pub mod cursor;
pub mod dhus;
pub mod error;
pub mod ledger;
pub mod state;
pub mod tracker;
