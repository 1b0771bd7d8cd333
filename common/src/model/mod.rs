pub mod classification;
pub mod history;
pub mod queue;
pub mod report;
pub mod species;
pub mod stats;
pub mod user;
