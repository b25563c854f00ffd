pub mod activity;
pub mod contact;
pub mod conversation;
pub mod plan;
pub mod user;
