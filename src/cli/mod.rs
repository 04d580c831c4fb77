pub mod capture;
pub mod terminal_page;

pub use capture::{HostedCaptureFactory, render_capture_url};
pub use terminal_page::TerminalPage;
