pub mod debounce;
pub mod fetcher;
pub mod library;
pub mod paginator;
pub mod reconciler;
pub mod resolver;
pub mod session;

pub use debounce::Debouncer;
pub use fetcher::{ContentFetcher, HtmlExtractor};
pub use library::{Account, Library};
pub use paginator::{Paginator, EMPTY_DOCUMENT_MESSAGE};
pub use reconciler::{PositionReconciler, ReconcilerState};
pub use resolver::resolve_restore_target;
pub use session::{Collaborators, ReadingSession};
