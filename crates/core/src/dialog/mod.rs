pub mod context;
pub mod handler;
pub mod subject;
