use salvo::async_trait;
use salvo::http::{ParseError, StatusCode};
use salvo::prelude::*;
use userdesk_data::DataError;

use crate::exts::DepotExt;
use crate::session::SessionError;
use crate::templates;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("invalid request: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Parse(_) | Self::Data(DataError::InvalidId) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the visitor.
    fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "The request could not be understood.",
            _ => "Something went wrong on our side. Please try again later.",
        }
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, req: &mut Request, depot: &mut Depot, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, path = %req.uri().path(), "request failed");
        } else {
            tracing::warn!(error = %self, path = %req.uri().path(), "bad request");
        }

        res.status_code(status);
        match templates::render_error(status, self.public_message(), depot.current_user()) {
            Ok(html) => res.render(Text::Html(html)),
            Err(e) => {
                tracing::error!(error = %e, "failed to render error page");
                res.render(Text::Plain(self.public_message()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_id_is_a_client_error() {
        assert_eq!(
            AppError::from(DataError::InvalidId).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_failures_are_server_errors() {
        assert_eq!(
            AppError::from(DataError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
