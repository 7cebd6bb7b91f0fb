// Application layer - Use case interactors

pub mod batch_interactor;
pub mod inspect_interactor;
pub mod remux_interactor;

// Re-export interactors
pub use batch_interactor::{BatchInteractor, BatchJobs, JobOutcome};
pub use inspect_interactor::{InspectInteractor, InspectReport, TimestampReport};
pub use remux_interactor::RemuxInteractor;
