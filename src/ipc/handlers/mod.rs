pub mod accounts;
pub mod assignments;
pub mod backup;
pub mod classes;
pub mod core;
