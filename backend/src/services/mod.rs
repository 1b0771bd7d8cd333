pub mod history;
pub mod queue;
pub mod report;
pub mod species;
pub mod upload;
pub mod users;
