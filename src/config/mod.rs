//! Configuration module

mod site;

pub use site::AdminConfig;
pub use site::MediaConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::MAX_SESSION_TTL_MINUTES;
