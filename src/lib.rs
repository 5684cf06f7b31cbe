pub mod config;
pub mod records;
pub mod rest;
pub mod tasks;
pub mod window;

pub mod prelude {
    pub use hypercore_common::prelude::*;

    pub use crate::rest::RestApi;
    pub use crate::rest::cached::CachedRestClient;
    pub use crate::rest::client::RestClient;
    pub use crate::rest::types::{MatchPolicy, Query, Record, TaskTag};
}
