use salvo::Depot;
use userdesk_data::User;

use crate::{AppError, AppResult, AppState};

const SESSION_TOKEN_KEY: &str = "userdesk::session_token";

pub trait DepotExt {
    fn app_state(&self) -> AppResult<&AppState>;
    /// The signed-in, active user for this request.
    fn current_user(&self) -> Option<&User>;
    fn session_token(&self) -> Option<&str>;
    fn set_session_token(&mut self, token: String);
}

impl DepotExt for Depot {
    fn app_state(&self) -> AppResult<&AppState> {
        self.obtain::<AppState>()
            .map_err(|_| AppError::internal("app state is not injected"))
    }

    fn current_user(&self) -> Option<&User> {
        self.obtain::<User>().ok()
    }

    fn session_token(&self) -> Option<&str> {
        self.get::<String>(SESSION_TOKEN_KEY)
            .ok()
            .map(String::as_str)
    }

    fn set_session_token(&mut self, token: String) {
        self.insert(SESSION_TOKEN_KEY, token);
    }
}
