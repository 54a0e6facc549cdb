use gpudeck_backend::{ApiError, ApiResult};

/// Dismissible page-level error message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBanner {
    message: Option<String>,
}

impl ErrorBanner {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.message.is_some()
    }

    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn dismiss(&mut self) {
        self.message = None;
    }

    /// Show `err` unless it only means "not signed in".
    pub fn report(&mut self, what: &str, err: &ApiError) {
        if err.is_unauthorized() {
            tracing::debug!("{}: not signed in", what);
            return;
        }
        tracing::warn!("⚠️ {} failed: {}", what, err);
        self.show(err.user_message());
    }

    /// Unwrap a fetch result, falling back to empty data.
    ///
    /// Success clears the banner. A 401 yields empty data silently; any
    /// other failure yields empty data and shows the banner.
    pub fn settle<T: Default>(&mut self, what: &str, result: ApiResult<T>) -> T {
        match result {
            Ok(v) => {
                self.dismiss();
                v
            }
            Err(e) => {
                self.report(what, &e);
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_silent_and_empty() {
        let mut b = ErrorBanner::default();
        let v: Vec<u8> = b.settle("jobs", Err(ApiError::Unauthorized));
        assert!(v.is_empty());
        assert!(!b.is_visible());
    }

    #[test]
    fn failures_show_and_success_clears() {
        let mut b = ErrorBanner::default();
        let v: Vec<u8> = b.settle("jobs", Err(ApiError::Network("refused".into())));
        assert!(v.is_empty());
        assert_eq!(
            b.message(),
            Some(gpudeck_common::error::GENERIC_ERROR_MESSAGE)
        );
        let v = b.settle("jobs", Ok(vec![1u8]));
        assert_eq!(v, vec![1]);
        assert!(!b.is_visible());
    }
}
