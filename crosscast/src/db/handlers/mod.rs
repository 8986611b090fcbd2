pub mod posts;
pub mod users;

pub use posts::Posts;
pub use users::Users;
