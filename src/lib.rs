pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod flickr;
pub mod image_view;
pub mod models;
pub mod viewer;

pub use config::Settings;
pub use controller::{Message, SearchController, SearchState, SubmitOutcome};
pub use error::{ControllerError, FetchError};
pub use fetcher::{FlickrClient, PhotoService};
pub use models::{PhotoRecord, SearchQuery, SearchResult};
