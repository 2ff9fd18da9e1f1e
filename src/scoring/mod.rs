pub mod award;
pub mod badge;
pub mod service;
