pub mod models;
pub mod repositories;
pub mod store;

pub mod prelude {
    pub use crate::db::models::achievement::{Achievement, AchievementId, UnlockedAchievement};
    pub use crate::db::models::alert::{AlertId, InjuryAlert, NewInjuryAlert, RiskLevel};
    pub use crate::db::models::coach::{
        CoachAnalytics, CoachAthlete, CoachMetricsSummary, NewCoachAthlete, NewPerformanceRecord,
        PerformanceRecord,
    };
    pub use crate::db::models::talent::{ApproveTalent, NewTalent, Talent, TalentId};
    pub use crate::db::models::task::{
        DailyTask, Difficulty, NewDailyTask, TaskCategory, TaskId,
    };
    pub use crate::db::models::user::{
        NewUser, ProfileUpdate, Role, SkillMetrics, User, UserId,
    };

    pub use crate::db::repositories::achievements::AchievementRepository;
    pub use crate::db::repositories::alerts::AlertRepository;
    pub use crate::db::repositories::coach::CoachRepository;
    pub use crate::db::repositories::leaderboard::{
        LeaderboardFilter, LeaderboardRepository, RankedAthlete,
    };
    pub use crate::db::repositories::talents::TalentRepository;
    pub use crate::db::repositories::tasks::TaskRepository;
    pub use crate::db::repositories::users::UserRepository;

    pub use crate::db::store::{Store, StoreError, StoreResult};
}
