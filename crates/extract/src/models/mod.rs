mod article;
mod options;
mod tracking;

pub use self::article::{Article, Details};
pub use self::options::ExtractOptions;
pub use self::tracking::TrackingFilter;
