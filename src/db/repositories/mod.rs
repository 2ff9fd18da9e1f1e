pub mod achievements;
pub mod alerts;
pub mod coach;
pub mod leaderboard;
pub mod talents;
pub mod tasks;
pub mod users;
