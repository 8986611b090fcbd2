pub mod posts;
pub mod threads;
pub mod users;
