//! PGT storage backends.

pub mod entity;
pub mod memory;
pub mod migrations;
pub mod sea_orm_repo;

pub use memory::InMemoryPgtStore;
pub use sea_orm_repo::SeaOrmPgtStore;
