#![allow(dead_code)]

use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::http::header::{COOKIE, LOCATION, REFERER};
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use userdesk_data::{
    DataError, DataResult, MemoryUserStore, NewUser, Role, User, UserChanges, UserHook, UserId,
    UserStore,
};
use userdesk_server::config::SessionConfig;
use userdesk_server::{AppState, SessionManager, service};

pub const BASE: &str = "http://127.0.0.1:5800";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret1";

/// A fresh service over an in-memory store, plus a cookie-carrying client.
pub struct Browser {
    pub service: Service,
    pub users: Arc<MemoryUserStore>,
    cookie_name: String,
    cookie: Option<String>,
}

pub struct Page {
    pub status: Option<StatusCode>,
    pub location: Option<String>,
    pub body: String,
}

impl Page {
    pub fn assert_redirect(&self, location: &str) {
        assert_eq!(self.status, Some(StatusCode::FOUND), "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(location));
    }
}

impl Browser {
    pub fn new() -> Self {
        Self::with_store(|users| users)
    }

    /// Serves through a store whose inserts always fail. [`Browser::seed`]
    /// still writes to the inner store.
    pub fn with_failing_inserts() -> Self {
        Self::with_store(|users| Arc::new(FailingInserts(users)))
    }

    fn with_store(wrap: impl FnOnce(Arc<MemoryUserStore>) -> Arc<dyn UserStore>) -> Self {
        let hook = UserHook::new(Some(ADMIN_EMAIL)).with_cost(4);
        let users = Arc::new(MemoryUserStore::new(hook));
        let session_config = SessionConfig::default();
        let sessions = Arc::new(SessionManager::new(&session_config));
        let state = AppState::new(wrap(users.clone()), sessions);
        Self {
            service: service(state),
            users,
            cookie_name: session_config.cookie_name,
            cookie: None,
        }
    }

    pub fn seed(&self, email: &str, name: &str, role: Option<Role>) -> User {
        self.users
            .insert(NewUser {
                email: email.to_owned(),
                password: PASSWORD.to_owned(),
                name: name.to_owned(),
                role,
                is_active: None,
            })
            .unwrap()
    }

    pub async fn get(&mut self, path: &str) -> Page {
        self.send(TestClient::get(format!("{BASE}{path}")), None).await
    }

    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> Page {
        self.post_from(path, form, None).await
    }

    pub async fn post_from(
        &mut self,
        path: &str,
        form: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Page {
        let request = TestClient::post(format!("{BASE}{path}")).form(&form);
        self.send(request, referer).await
    }

    async fn send(&mut self, mut request: salvo::test::RequestBuilder, referer: Option<&str>) -> Page {
        if let Some(cookie) = &self.cookie {
            request = request.add_header(COOKIE, format!("{}={cookie}", self.cookie_name), true);
        }
        if let Some(referer) = referer {
            request = request.add_header(REFERER, format!("{BASE}{referer}"), true);
        }
        let mut res = request.send(&self.service).await;
        if let Some(cookie) = res.cookie(&self.cookie_name) {
            self.cookie = Some(cookie.value().to_owned());
        }
        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Page {
            status: res.status_code,
            location,
            body: res.take_string().await.unwrap_or_default(),
        }
    }

    pub async fn login(&mut self, email: &str) -> Page {
        self.post("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }

    pub async fn login_as_admin(&mut self) -> User {
        let admin = self.seed(ADMIN_EMAIL, "Admin", None);
        self.login(ADMIN_EMAIL).await.assert_redirect("/");
        admin
    }
}

/// Delegates to a memory store but rejects every insert.
#[derive(Debug)]
pub struct FailingInserts(Arc<MemoryUserStore>);

impl UserStore for FailingInserts {
    fn find_by_id(&self, id: &UserId) -> DataResult<Option<User>> {
        self.0.find_by_id(id)
    }

    fn find_by_email(&self, email: &str) -> DataResult<Option<User>> {
        self.0.find_by_email(email)
    }

    fn list(&self) -> DataResult<Vec<User>> {
        self.0.list()
    }

    fn insert(&self, _new: NewUser) -> DataResult<User> {
        Err(DataError::Poisoned)
    }

    fn save(&self, user: &User) -> DataResult<User> {
        self.0.save(user)
    }

    fn update(&self, id: &UserId, changes: UserChanges) -> DataResult<Option<User>> {
        self.0.update(id, changes)
    }

    fn delete(&self, id: &UserId) -> DataResult<Option<User>> {
        self.0.delete(id)
    }
}
