pub mod feedback;
pub mod recommendation_logs;
pub mod recommendations;
