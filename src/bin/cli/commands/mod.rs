pub mod backup;
pub mod due;
pub mod mastery;
pub mod progress;
pub mod record;
pub mod review;
pub mod stats;
