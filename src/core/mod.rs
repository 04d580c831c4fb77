pub mod alerts;
pub mod auth_gate;
pub mod detector;
pub mod feedback;
pub mod orchestrator;
pub mod page;

pub use alerts::{Alert, AlertId, AlertPresenter, AlertView};
pub use auth_gate::{AuthGate, AuthenticatedIdentity, FileIdentityStore, IdentityProvider};
pub use detector::{CaptureWidget, CompletionNotifier, Container, DetectorAdapter, PendingAnalysis, SimulatedWidgetFactory, WidgetFactory, WidgetOptions};
pub use feedback::submit_feedback;
pub use orchestrator::{FlowOutcome, FlowState, VerificationOrchestrator};
pub use page::{HeadlessPage, Page, PageState};
