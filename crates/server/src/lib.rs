pub mod config;
pub mod error;
pub mod exts;
pub mod forms;
pub mod hoops;
pub mod logging;
pub mod routing;
pub mod session;
pub mod templates;

use std::sync::Arc;

use salvo::async_trait;
use salvo::catcher::Catcher;
use salvo::prelude::*;
use userdesk_data::UserStore;

pub use error::{AppError, AppResult};
pub use session::SessionManager;

/// Shared handles every handler reaches through the depot.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }
}

#[async_trait]
impl Handler for AppState {
    async fn handle(
        &self,
        _req: &mut Request,
        depot: &mut Depot,
        _res: &mut Response,
        _ctrl: &mut FlowCtrl,
    ) {
        depot.inject(self.clone());
    }
}

/// The complete web service: routes plus the HTML error catcher.
pub fn service(state: AppState) -> Service {
    Service::new(routing::router(state)).catcher(Catcher::default().hoop(routing::catch_status))
}
