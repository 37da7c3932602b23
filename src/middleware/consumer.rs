use crate::middleware::{MiddlewareItem, PathMiddleware, instantiate};

/// Collects middleware registered by hand from a module's `configure` hook.
///
/// # Example
/// ```
/// use meshestra_compiler::middleware::{MiddlewareConsumer, MiddlewareItem, Next};
///
/// let mut consumer = MiddlewareConsumer::new();
/// consumer
///     .apply([MiddlewareItem::function("audit", |req, next: Next| next.run(req))])
///     .exclude(["/cats/health"])
///     .for_routes(["/cats"]);
///
/// assert_eq!(consumer.registrations()[0].path(), "/cats");
/// ```
#[derive(Debug, Default)]
pub struct MiddlewareConsumer {
    registrations: Vec<PathMiddleware>,
}

impl MiddlewareConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        items: impl IntoIterator<Item = MiddlewareItem>,
    ) -> MiddlewareConfigProxy<'_> {
        MiddlewareConfigProxy {
            consumer: self,
            items: items.into_iter().collect(),
            excluded: Vec::new(),
        }
    }

    pub fn registrations(&self) -> &[PathMiddleware] {
        &self.registrations
    }

    pub fn into_registrations(self) -> Vec<PathMiddleware> {
        self.registrations
    }
}

/// Pending registration returned by [`MiddlewareConsumer::apply`].
pub struct MiddlewareConfigProxy<'a> {
    consumer: &'a mut MiddlewareConsumer,
    items: Vec<MiddlewareItem>,
    excluded: Vec<String>,
}

impl<'a> MiddlewareConfigProxy<'a> {
    /// Paths under which the middleware must not run.
    pub fn exclude<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.excluded.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Register the middleware for each path prefix.
    pub fn for_routes<I, P>(self, paths: I) -> &'a mut MiddlewareConsumer
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        for path in paths {
            let path = path.into();
            tracing::debug!(%path, middleware = self.items.len(), "Registering configured middleware");
            let group = instantiate(path, &self.items).excluding(self.excluded.clone());
            self.consumer.registrations.push(group);
        }
        self.consumer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;

    fn audit() -> MiddlewareItem {
        MiddlewareItem::function("audit", |req, next: Next| next.run(req))
    }

    #[test]
    fn test_registers_one_group_per_route() {
        let mut consumer = MiddlewareConsumer::new();
        consumer
            .apply([audit()])
            .for_routes(["/cats", "/dogs"])
            .apply([audit(), audit()])
            .for_routes(["/birds"]);

        let shape: Vec<(&str, usize)> = consumer
            .registrations()
            .iter()
            .map(|group| (group.path(), group.handlers().len()))
            .collect();

        assert_eq!(shape, vec![("/cats", 1), ("/dogs", 1), ("/birds", 2)]);
    }

    #[test]
    fn test_exclusions_apply_to_every_route() {
        let mut consumer = MiddlewareConsumer::new();
        consumer
            .apply([audit()])
            .exclude(["/cats/health"])
            .for_routes(["/cats"]);

        let group = &consumer.registrations()[0];
        assert!(group.matches("/cats/1"));
        assert!(!group.matches("/cats/health"));
    }
}
