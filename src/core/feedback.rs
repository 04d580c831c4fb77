use crate::core::page::Page;
use crate::service::client::SessionApi;

pub const FEEDBACK_FAILED_MESSAGE: &str = "Error submitting feedback";

/// Posts a user report and shows the backend's reply, or a generic error.
///
/// Returns whether the backend acknowledged the report.
pub async fn submit_feedback(
    api: &dyn SessionApi,
    page: &dyn Page,
    user_id: &str,
    description: &str,
) -> bool {
    match api.submit_feedback(user_id, description).await {
        Ok(message) => {
            page.show_message(&message);
            true
        }
        Err(e) => {
            tracing::error!("Feedback submission failed: {}", e);
            page.show_message(FEEDBACK_FAILED_MESSAGE);
            false
        }
    }
}
