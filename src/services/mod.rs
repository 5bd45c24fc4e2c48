pub mod assistant;
pub mod google;
pub mod password;
pub mod places;

pub use assistant::GeminiClient;
pub use google::GoogleAuthClient;
pub use places::PlacesClient;
