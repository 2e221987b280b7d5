// Repositories module - data access layer

pub mod cart_storage;
pub mod service_repository;

pub use cart_storage::{CartStorage, FileCartStorage, InMemoryCartStorage};
pub use service_repository::{
    DynamoDbServiceRepository, InMemoryServiceRepository, ServiceRepository,
};
