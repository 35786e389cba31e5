//! Static fixture routes.

use crate::matching::PatternError;
use crate::router::Router;
use crate::types::fixture::Fixture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

impl Router {
    /// Register each fixture as a route answering with its fixed response.
    pub fn mount(&self, fixtures: &[Fixture]) -> Result<&Self, PatternError> {
        for fixture in fixtures {
            let scoped = match &fixture.base {
                Some(base) => self.base(base),
                None => self.clone(),
            };
            let shared = Arc::new(fixture.clone());

            scoped.route(fixture.method, &fixture.path, move |_req, mut res| {
                let fixture = Arc::clone(&shared);
                async move {
                    if let Some(delay) = fixture.delay {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }

                    res.status(fixture.status.unwrap_or(200))?;
                    for (name, value) in fixture.headers.iter().flatten() {
                        res.header(name, value.as_str())?;
                    }

                    match &fixture.body {
                        None => res.end()?,
                        Some(Value::String(text)) => res.send(text.clone())?,
                        Some(body) => res.json(body)?,
                    }
                    anyhow::Ok(())
                }
            })?;
        }
        Ok(self)
    }
}
