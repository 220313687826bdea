/// Per-request context built by the auth middleware
#[derive(Clone)]
pub struct Ctx {
    pub token: Option<String>,
}

impl Ctx {
    pub fn new(token: Option<String>) -> Self {
        Ctx { token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
