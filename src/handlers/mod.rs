pub mod activity;
pub mod chat;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod plans;
pub mod profile;
