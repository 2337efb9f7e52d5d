//! Instrumented backend clients.
//!
//! Each backend has a narrow async client trait and a proxy implementing the
//! same trait. The proxy forwards every call to the wrapped client through its
//! [`MetricsHub`], which records one command per call into ALL plus one class
//! category.

pub mod category;
pub mod instrument;
pub mod redis;
pub mod sql;
pub mod wide_column;

pub use category::{
    classify_sql, CommandClass, CATEGORY_ALL, CATEGORY_DDL, CATEGORY_DML, CATEGORY_DQL,
    CATEGORY_OTHER,
};
pub use instrument::{MetricsHub, RESULT_ERROR, RESULT_SUCCESS};
pub use redis::{RedisClient, RedisProxy};
pub use sql::{ExecResult, Row, SqlClient, SqlProxy};
pub use wide_column::{
    GetItemOutput, Item, KeyElement, KeyType, PageOutput, QueryInput, ScanInput,
    TableDescription, WideColumnClient, WideColumnProxy, WriteItemOutput,
};
