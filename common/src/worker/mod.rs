// Worker-side check service

pub mod service;

pub use service::CheckService;
