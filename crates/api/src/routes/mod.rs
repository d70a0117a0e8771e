//! API routes

pub mod achievements;
pub mod activities;
pub mod badges;
pub mod challenges;
pub mod factors;
pub mod health;
pub mod leaderboard;
pub mod notifications;
pub mod progression;
