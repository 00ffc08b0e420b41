pub mod debounce;
pub mod providers;
pub mod search;
pub mod session;
pub mod trending;
pub mod view;

pub use debounce::Debounced;
pub use providers::{DramaProvider, TmdbProvider};
pub use session::SearchSession;
pub use trending::{top_searches, TrendingRecorder, TrendingRecorderHandle};
pub use view::{SearchStatus, SearchView, ViewEvent};
