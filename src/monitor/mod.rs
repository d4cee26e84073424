pub mod aggregate;
pub mod gateway;
pub mod scheduler;
pub mod store;
pub mod view;
