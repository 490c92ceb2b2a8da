pub mod errors;
pub mod db;
pub mod user;
pub mod user_role;
pub mod setting;

#[cfg(test)]
mod tests;
