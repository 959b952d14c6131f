#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Services,
    Appointments,
    Dashboard,
    Login,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Services => "Services",
            Route::Appointments => "Appointments",
            Route::Dashboard => "Dashboard",
            Route::Login => "Login",
        }
    }
}

/// Moves the user to another view. Supplied by whatever front-end hosts the engine.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: Route);
}

/// Navigator for headless use: records the move in the log and nothing else.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate_to(&self, route: Route) {
        tracing::info!(route = route.as_str(), "navigate");
    }
}
