pub mod account;
pub mod api_key;
pub mod dimension;
pub mod fx_rate;
pub mod metric;
pub mod milestone;
pub mod net_worth;
pub mod score;
pub mod streak;
pub mod task;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use api_key::ApiKey;
pub use dimension::Dimension;
pub use fx_rate::FxRate;
pub use metric::{MetricDefinition, MetricRecord};
pub use milestone::Milestone;
pub use net_worth::NetWorthSnapshot;
pub use score::ScoreRecord;
pub use streak::{Streak, StreakWithTask};
pub use task::Task;
pub use transaction::Transaction;
pub use user::User;
