pub mod errors;
pub mod db;
pub mod user;
pub mod user_profile;
pub mod group;
pub mod group_user;

#[cfg(test)]
mod tests;
