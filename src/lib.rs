mod database {
    pub mod actions;
    pub mod error;
    pub mod pagination;
    pub mod schema;
    pub mod shopping;
    pub mod validate;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
