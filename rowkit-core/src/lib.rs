mod as_value;
mod codec;
mod config;
mod connection;
mod cursor;
mod data_source_session;
mod decode_type;
mod error;
mod proxy;
mod repository;
mod reservation;
mod row_tuple;
mod schema;
mod session;
pub mod sql;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use codec::*;
pub use config::*;
pub use connection::*;
pub use cursor::*;
pub use data_source_session::*;
pub use decode_type::*;
pub use error::*;
pub use proxy::*;
pub use repository::*;
pub use reservation::*;
pub use row_tuple::*;
pub use schema::*;
pub use session::*;
pub use sql::{ColumnMode, expand_column_splat};
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
