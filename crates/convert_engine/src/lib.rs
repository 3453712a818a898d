//! Conversion engine: talks to the remote service and drives jobs to completion.
mod artifact;
mod orchestrator;
mod poller;
mod service;
mod settings;
mod sink;
mod submit;

pub use artifact::{Artifact, ArtifactFetcher, SavedArtifact};
pub use orchestrator::{JobUpdate, Orchestrator};
pub use poller::{PollEnd, PollObserver, PollerPhase, ProgressPoller};
pub use service::{RawArtifact, RemoteJobService, ReqwestJobService};
pub use settings::{EngineSettings, ServiceSettings};
pub use sink::{ArtifactSink, DirectorySink, SinkError};
pub use submit::{JobSubmitter, Submission, SubmitFailure};
