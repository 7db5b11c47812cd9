pub mod env_file;
pub mod user_file;
